// ReturnBot Engine — WhatsApp Channel (Cloud API)
//
// Module layout:
//   payload   — serde model of Meta's webhook notifications, extract_events
//   webhook   — axum router: handshake GET, signed notification POST
//   cloud_api — CloudApi: send_text, fetch_media, split_message
//   relay     — per-message dispatch: customer chat loop + owner commands

pub mod payload;
pub mod webhook;
pub(crate) mod cloud_api;
pub(crate) mod relay;

// ── Re-exports ───────────────────────────────────────────────────────

pub use cloud_api::{split_message, CloudApi};
pub use webhook::router;
