// ReturnBot Engine — WhatsApp Cloud API Client
// send_text, fetch_media, split_message
//
// Thin wrapper over the Graph API: text sends from the business number and
// the two-step media download (resolve URL by id, then fetch bytes).

use crate::atoms::error::{RelayError, RelayResult};
use crate::engine::config::Config;
use log::{info, warn};
use reqwest::Client;
use serde_json::json;

/// WhatsApp text message character limit.
const MAX_MESSAGE_LENGTH: usize = 4096;

// ── Client ─────────────────────────────────────────────────────────────

pub struct CloudApi {
    client: Client,
    base_url: String,
    token: String,
    phone_number_id: String,
}

impl CloudApi {
    pub fn new(config: &Config) -> Self {
        CloudApi {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url: config.graph_api_base.trim_end_matches('/').to_string(),
            token: config.whatsapp_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
        }
    }

    // ── Sending ────────────────────────────────────────────────────────

    /// Send a text message, splitting at the platform limit.
    pub async fn send_text(&self, to: &str, text: &str) -> RelayResult<()> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);

        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            let body = json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": {"preview_url": false, "body": chunk},
            });

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let err_text = resp.text().await.unwrap_or_default();
                warn!(
                    "[whatsapp] sendText error {}: {}",
                    status,
                    &err_text[..err_text.len().min(300)]
                );
                return Err(RelayError::channel(
                    "whatsapp",
                    format!("sendText failed ({})", status),
                ));
            }
        }

        info!("[whatsapp] sent {} chars to {}", text.len(), to);
        Ok(())
    }

    // ── Media download ─────────────────────────────────────────────────

    /// Download a media object: resolve the short-lived URL by id, then
    /// fetch the bytes. Returns (mime_type, bytes), all in memory.
    pub async fn fetch_media(&self, media_id: &str) -> RelayResult<(String, Vec<u8>)> {
        let meta_url = format!("{}/{}", self.base_url, media_id);
        let resp = self
            .client
            .get(&meta_url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RelayError::channel(
                "whatsapp",
                format!("media lookup failed ({})", resp.status()),
            ));
        }

        let meta: serde_json::Value = resp.json().await?;
        let media_url = meta["url"]
            .as_str()
            .ok_or_else(|| RelayError::channel("whatsapp", "media lookup returned no url"))?
            .to_string();
        let mime_type = meta["mime_type"].as_str().unwrap_or("image/jpeg").to_string();

        let download = self
            .client
            .get(&media_url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !download.status().is_success() {
            return Err(RelayError::channel(
                "whatsapp",
                format!("media download failed ({})", download.status()),
            ));
        }

        let bytes = download.bytes().await?.to_vec();
        info!("[whatsapp] downloaded media {} ({} bytes)", media_id, bytes.len());
        Ok((mime_type, bytes))
    }
}

// ── Utility ────────────────────────────────────────────────────────────

/// Split a long message into chunks at a given byte limit, preferring
/// newline/space breaks. Limit-adjacent splits land on char boundaries so
/// multibyte (Devanagari) text never panics.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }
        let mut window_end = max_len;
        while window_end > 0 && !remaining.is_char_boundary(window_end) {
            window_end -= 1;
        }
        let window = &remaining[..window_end];
        let mut split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .unwrap_or(window_end);
        if split_at == 0 {
            split_at = window_end;
        }
        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }
    chunks
}
