// ReturnBot Engine — Google Gemini Provider
// Formats the stored transcript into Gemini `contents`, sends one
// non-streaming generateContent request, and extracts the reply text.

use crate::atoms::error::{RelayError, RelayResult};
use crate::engine::config::Config;
use crate::engine::types::{Part, Role, Turn};
use log::{error, info, warn};
use reqwest::Client;
use serde_json::{json, Value};

// ── Struct ─────────────────────────────────────────────────────────────

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        GeminiClient {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url: config.gemini_base.trim_end_matches('/').to_string(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }

    // ── Request formatting ─────────────────────────────────────────────

    /// Map stored turns to Gemini `contents` entries.
    ///
    /// Gemini requires strictly alternating user/model turns; consecutive
    /// same-role entries cause INVALID_ARGUMENT 400. A failed provider call
    /// leaves a user turn without a model reply, so consecutive user turns
    /// do occur — merge their parts into one entry.
    fn format_contents(history: &[Turn]) -> Vec<Value> {
        let mut contents: Vec<Value> = Vec::new();

        for turn in history {
            let role = match turn.role {
                Role::User => "user",
                Role::Model => "model",
            };

            let parts: Vec<Value> = turn
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text { text } => json!({"text": text}),
                    Part::InlineImage { mime_type, data_b64 } => json!({
                        "inlineData": {
                            "mimeType": mime_type,
                            "data": data_b64,
                        }
                    }),
                })
                .collect();

            let same_role = contents
                .last()
                .and_then(|e| e["role"].as_str())
                .map(|r| r == role)
                .unwrap_or(false);

            if same_role {
                if let Some(last) = contents.last_mut() {
                    if let Some(existing) = last["parts"].as_array_mut() {
                        existing.extend(parts);
                    }
                }
            } else {
                contents.push(json!({"role": role, "parts": parts}));
            }
        }

        contents
    }

    // ── Completion call ────────────────────────────────────────────────

    /// One blocking round-trip to generateContent. Returns the trimmed
    /// reply text. No retries — a failure aborts this message's handling.
    pub async fn generate(&self, system: &str, history: &[Turn]) -> RelayResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let contents = Self::format_contents(history);
        if contents.is_empty() {
            return Err(RelayError::provider("gemini", "empty transcript"));
        }

        let body = json!({
            "systemInstruction": {"parts": [{"text": system}]},
            "contents": contents,
        });

        info!("[gemini] request model={} turns={}", self.model, history.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            error!(
                "[gemini] error {}: {}",
                status,
                &body_text[..body_text.len().min(500)]
            );
            return Err(RelayError::provider(
                "gemini",
                format!("API error {}: {}", status, &body_text[..body_text.len().min(200)]),
            ));
        }

        let v: Value = response.json().await?;
        Self::extract_reply(&v)
    }

    /// Pull the reply text out of a generateContent response body.
    fn extract_reply(v: &Value) -> RelayResult<String> {
        let candidate = v["candidates"]
            .get(0)
            .ok_or_else(|| RelayError::provider("gemini", "response has no candidates"))?;

        let finish_reason = candidate["finishReason"].as_str().unwrap_or("STOP");

        let text: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            // Blocked or empty response (SAFETY, RECITATION, MAX_TOKENS…)
            warn!("[gemini] empty candidate, finishReason={}", finish_reason);
            return Err(RelayError::provider(
                "gemini",
                format!("empty response (finishReason: {})", finish_reason),
            ));
        }

        Ok(text.trim().to_string())
    }
}
