// ReturnBot Engine — Core types
// The data structures that flow through the relay: conversation turns and
// their content parts. Independent of the Gemini wire format.

use serde::{Deserialize, Serialize};

// ── Conversation turns ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One content part of a turn. Text for ordinary messages; inline images
/// carry the raw bytes base64-encoded, ready for the provider's
/// `inlineData` format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "inline_image")]
    InlineImage { mime_type: String, data_b64: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

/// One exchange unit stored for context continuity across provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
    /// Arrival time, for owner summaries. Not sent to the provider.
    pub at: chrono::DateTime<chrono::Utc>,
}

impl Turn {
    pub fn user(parts: Vec<Part>) -> Self {
        Turn { role: Role::User, parts, at: chrono::Utc::now() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Turn { role: Role::Model, parts: vec![Part::text(text)], at: chrono::Utc::now() }
    }

    /// Concatenated text parts of this turn (images contribute nothing).
    pub fn as_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

// ── Inbound message (post-webhook, pre-relay) ──────────────────────────

/// A normalized inbound WhatsApp message, extracted from the webhook
/// payload and ready for dispatch.
#[derive(Debug, Clone)]
pub enum Inbound {
    Text { from: String, body: String },
    Image { from: String, media_id: String, caption: Option<String> },
}

impl Inbound {
    pub fn from(&self) -> &str {
        match self {
            Inbound::Text { from, .. } => from,
            Inbound::Image { from, .. } => from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_as_text_joins_text_parts() {
        let turn = Turn::user(vec![Part::text("hello "), Part::text("world")]);
        assert_eq!(turn.as_text(), "hello world");
    }

    #[test]
    fn turn_as_text_skips_images() {
        let turn = Turn::user(vec![
            Part::text("see photo"),
            Part::InlineImage { mime_type: "image/jpeg".into(), data_b64: "QUJD".into() },
        ]);
        assert_eq!(turn.as_text(), "see photo");
    }
}
