// ReturnBot Engine — Configuration
// Config, Config::from_env
//
// Everything comes from the process environment (`.env` honored via dotenvy
// in main). Missing required variables abort startup with a Config error.

use crate::atoms::error::{RelayError, RelayResult};
use log::warn;

// ── Defaults ───────────────────────────────────────────────────────────

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

// ── Config struct ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    /// Google Generative Language API key.
    pub gemini_api_key: String,
    /// Model used for every chat-completion call (default: gemini-1.5-flash).
    pub gemini_model: String,
    /// Gemini API base URL (override for testing).
    pub gemini_base: String,
    /// WhatsApp Cloud API bearer token (sends + media downloads).
    pub whatsapp_token: String,
    /// Business phone-number id replies are sent from.
    pub phone_number_id: String,
    /// Shared secret echoed back during the webhook verification handshake.
    pub verify_token: String,
    /// Meta app secret. When set, X-Hub-Signature-256 is enforced on every
    /// webhook POST; when unset, signature checks are skipped.
    pub app_secret: Option<String>,
    /// Fallback store-owner wa_id when the directory lookup is unconfigured
    /// or misses.
    pub owner_number: Option<String>,
    /// Remote table-store endpoint resolving phone-number-id → owner contact.
    pub store_directory_url: Option<String>,
    /// Bearer token for the table-store endpoint.
    pub store_directory_token: Option<String>,
    /// Graph API base URL (override for testing).
    pub graph_api_base: String,
    /// Listen address for the webhook server.
    pub bind_addr: String,
}

impl Config {
    /// Build the config from the process environment.
    /// Fails fast on any missing required variable.
    pub fn from_env() -> RelayResult<Self> {
        let config = Config {
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_base: optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE.into()),
            whatsapp_token: required("WHATSAPP_TOKEN")?,
            phone_number_id: required("PHONE_NUMBER_ID")?,
            verify_token: required("VERIFY_TOKEN")?,
            app_secret: optional("APP_SECRET"),
            owner_number: optional("OWNER_NUMBER"),
            store_directory_url: optional("STORE_DIRECTORY_URL"),
            store_directory_token: optional("STORE_DIRECTORY_TOKEN"),
            graph_api_base: optional("GRAPH_API_BASE")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.into()),
            bind_addr: optional("BIND_ADDR")
                .or_else(|| optional("PORT").map(|p| format!("0.0.0.0:{}", p)))
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
        };

        if config.app_secret.is_none() {
            warn!("[config] APP_SECRET not set — webhook signature verification disabled");
        }
        if config.owner_number.is_none() && config.store_directory_url.is_none() {
            warn!("[config] No OWNER_NUMBER or STORE_DIRECTORY_URL — owner relay disabled");
        }

        Ok(config)
    }
}

// ── Env helpers ────────────────────────────────────────────────────────

fn required(name: &str) -> RelayResult<String> {
    optional(name)
        .ok_or_else(|| RelayError::Config(format!("missing required environment variable {}", name)))
}

/// Read a variable, treating empty/whitespace values as unset.
fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
