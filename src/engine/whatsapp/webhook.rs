// ReturnBot Engine — Webhook HTTP Surface
// router, verify_webhook, receive_webhook, verify_signature
//
// GET  /webhook — Meta's verification handshake (echo hub.challenge).
// POST /webhook — notification delivery. The raw body is read first so the
// X-Hub-Signature-256 check runs before JSON parsing; processing is spawned
// so the 200 goes back before any provider round-trip.

use crate::atoms::error::{RelayError, RelayResult};
use crate::engine::state::RelayState;
use crate::engine::whatsapp::payload::{self, Notification};
use crate::engine::whatsapp::relay;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use hmac::{Hmac, Mac};
use log::{info, warn};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .with_state(state)
}

// ── Verification handshake ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Echo the challenge iff mode is "subscribe" and the token matches.
async fn verify_webhook(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.verify_token.as_deref() == Some(state.config.verify_token.as_str());

    if mode_ok && token_ok {
        let challenge = params.challenge.unwrap_or_default();
        info!("[webhook] verification handshake accepted");
        (StatusCode::OK, challenge).into_response()
    } else {
        warn!("[webhook] verification handshake rejected (mode or token mismatch)");
        (StatusCode::FORBIDDEN, "Verification failed").into_response()
    }
}

// ── Notification delivery ──────────────────────────────────────────────

async fn receive_webhook(
    State(state): State<Arc<RelayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(secret) = &state.config.app_secret {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok());
        if let Err(e) = verify_signature(secret, &body, signature) {
            warn!("[webhook] rejected payload: {}", e);
            return StatusCode::FORBIDDEN;
        }
    }

    // Malformed JSON is acknowledged and dropped — a non-2xx would only
    // make Meta redeliver the same payload.
    let notification: Notification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            warn!("[webhook] unparseable payload: {}", e);
            return StatusCode::OK;
        }
    };

    for event in payload::extract_events(&notification) {
        let state = state.clone();
        tokio::spawn(async move {
            relay::handle_event(state, event).await;
        });
    }

    StatusCode::OK
}

// ── Body signature ─────────────────────────────────────────────────────

/// Verify the HMAC-SHA256 signature of a webhook POST body.
///
/// Meta sends `X-Hub-Signature-256: sha256=<hex digest>` computed over the
/// raw body with the app secret. Comparison is constant-time.
pub fn verify_signature(
    app_secret: &str,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> RelayResult<()> {
    let header = signature_header
        .ok_or_else(|| RelayError::Auth("missing X-Hub-Signature-256 header".into()))?;

    let hex_sig = header
        .strip_prefix("sha256=")
        .ok_or_else(|| RelayError::Auth("signature header missing sha256= prefix".into()))?;

    let provided = hex::decode(hex_sig)
        .map_err(|e| RelayError::Auth(format!("invalid hex in signature: {}", e)))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes())
        .map_err(|e| RelayError::Auth(format!("HMAC key error: {}", e)))?;
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    if expected.as_slice().ct_eq(provided.as_slice()).into() {
        Ok(())
    } else {
        Err(RelayError::Auth("signature mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-app-secret";

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn verify_signature_accepts_valid() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = sign(body);
        assert!(verify_signature(SECRET, body, Some(&header)).is_ok());
    }

    #[test]
    fn verify_signature_rejects_tampered_body() {
        let header = sign(b"original");
        assert!(verify_signature(SECRET, b"tampered", Some(&header)).is_err());
    }

    #[test]
    fn verify_signature_rejects_missing_header() {
        let err = verify_signature(SECRET, b"body", None).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn verify_signature_rejects_bad_prefix() {
        assert!(verify_signature(SECRET, b"body", Some("sha1=abcd")).is_err());
    }

    #[test]
    fn verify_signature_rejects_invalid_hex() {
        assert!(verify_signature(SECRET, b"body", Some("sha256=zznothex")).is_err());
    }
}
