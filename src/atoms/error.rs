// ── ReturnBot Atoms: Error Types ───────────────────────────────────────────
// Single canonical error enum for the relay, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, Network, Provider, Config…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • No variant carries secret material (API keys, tokens) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RelayError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Chat-completion API failure (non-secret detail only).
    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Messaging channel failure (Cloud API send, media download).
    #[error("Channel error: {channel}: {message}")]
    Channel { channel: String, message: String },

    /// Relay configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Webhook authentication failure (handshake token, body signature).
    #[error("Auth error: {0}")]
    Auth(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl RelayError {
    /// Create a provider error with name and message.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), message: message.into() }
    }

    /// Create a channel error with name and message.
    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel { channel: channel.into(), message: message.into() }
    }
}

// ── Migration bridge: String → RelayError ──────────────────────────────────
// Allows `?` on helpers still returning `Result<T, String>`.

impl From<String> for RelayError {
    fn from(s: String) -> Self {
        RelayError::Other(s)
    }
}

impl From<&str> for RelayError {
    fn from(s: &str) -> Self {
        RelayError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All relay operations should return this type.
pub type RelayResult<T> = Result<T, RelayError>;
