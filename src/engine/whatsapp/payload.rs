// ReturnBot Engine — WhatsApp Cloud API Webhook Payload
// Serde model of Meta's notification format plus extraction into the
// normalized Inbound type. Tolerant of partial payloads: every field
// defaults, status-only notifications simply extract to nothing.

use crate::engine::types::Inbound;
use log::debug;
use serde::Deserialize;

// ── Notification model ─────────────────────────────────────────────────

/// Top-level webhook notification. `object` is
/// "whatsapp_business_account" for message traffic.
#[derive(Debug, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// The receiving business number — used to resolve the store owner.
#[derive(Debug, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub phone_number_id: String,
}

/// A single inbound message. `type` selects which content field is set.
#[derive(Debug, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub image: Option<ImageContent>,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageContent {
    /// Media object id — exchanged for a download URL via the Graph API.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub caption: Option<String>,
}

// ── Extraction ─────────────────────────────────────────────────────────

/// An inbound message paired with the business number that received it.
#[derive(Debug)]
pub struct InboundEvent {
    pub phone_number_id: String,
    pub message: Inbound,
}

/// Flatten a notification into dispatchable events. Only `text` and
/// `image` messages survive; everything else (statuses, reactions,
/// stickers, audio…) is dropped with a debug log.
pub fn extract_events(notification: &Notification) -> Vec<InboundEvent> {
    let mut events = Vec::new();

    for entry in &notification.entry {
        for change in &entry.changes {
            let value = match &change.value {
                Some(v) => v,
                None => continue,
            };
            let phone_number_id = value
                .metadata
                .as_ref()
                .map(|m| m.phone_number_id.clone())
                .unwrap_or_default();

            for msg in &value.messages {
                let from = msg.from.trim().to_string();
                if from.is_empty() {
                    continue;
                }

                let inbound = match msg.msg_type.as_str() {
                    "text" => match &msg.text {
                        Some(t) if !t.body.trim().is_empty() => Inbound::Text {
                            from,
                            body: t.body.trim().to_string(),
                        },
                        _ => continue,
                    },
                    "image" => match &msg.image {
                        Some(img) if !img.id.is_empty() => Inbound::Image {
                            from,
                            media_id: img.id.clone(),
                            caption: img.caption.clone().filter(|c| !c.trim().is_empty()),
                        },
                        _ => continue,
                    },
                    other => {
                        debug!("[webhook] ignoring message type '{}'", other);
                        continue;
                    }
                };

                events.push(InboundEvent {
                    phone_number_id: phone_number_id.clone(),
                    message: inbound,
                });
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Notification {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_text_message() {
        let n = parse(
            r#"{
                "object": "whatsapp_business_account",
                "entry": [{"changes": [{"value": {
                    "metadata": {"phone_number_id": "1098765"},
                    "messages": [{"from": "911234567890", "id": "wamid.X",
                                  "type": "text", "text": {"body": " order damaged "}}]
                }}]}]
            }"#,
        );
        let events = extract_events(&n);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phone_number_id, "1098765");
        match &events[0].message {
            Inbound::Text { from, body } => {
                assert_eq!(from, "911234567890");
                assert_eq!(body, "order damaged");
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn extracts_image_with_caption() {
        let n = parse(
            r#"{
                "entry": [{"changes": [{"value": {
                    "metadata": {"phone_number_id": "1098765"},
                    "messages": [{"from": "911234567890", "type": "image",
                                  "image": {"id": "media-123", "caption": "broken seam"}}]
                }}]}]
            }"#,
        );
        let events = extract_events(&n);
        assert_eq!(events.len(), 1);
        match &events[0].message {
            Inbound::Image { media_id, caption, .. } => {
                assert_eq!(media_id, "media-123");
                assert_eq!(caption.as_deref(), Some("broken seam"));
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn ignores_unsupported_types_and_statuses() {
        let n = parse(
            r#"{
                "entry": [{"changes": [{"value": {
                    "metadata": {"phone_number_id": "1098765"},
                    "messages": [
                        {"from": "911234567890", "type": "sticker"},
                        {"from": "911234567890", "type": "audio"}
                    ]
                }}]}]
            }"#,
        );
        assert!(extract_events(&n).is_empty());
    }

    #[test]
    fn status_only_notification_extracts_nothing() {
        let n = parse(r#"{"entry": [{"changes": [{"value": {"metadata": {"phone_number_id": "1"}}}]}]}"#);
        assert!(extract_events(&n).is_empty());
    }

    #[test]
    fn empty_text_body_is_dropped() {
        let n = parse(
            r#"{"entry": [{"changes": [{"value": {
                "messages": [{"from": "911234567890", "type": "text", "text": {"body": "   "}}]
            }}]}]}"#,
        );
        assert!(extract_events(&n).is_empty());
    }
}
