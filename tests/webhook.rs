// Webhook surface integration tests: the verification handshake and the
// signed-notification POST, driven through the axum router with oneshot
// requests. No outbound API call is ever triggered — payloads are chosen
// so extraction yields nothing to relay.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use returnbot::engine::config::Config;
use returnbot::engine::state::RelayState;
use returnbot::engine::whatsapp;
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

const VERIFY_TOKEN: &str = "my-verify-token";
const APP_SECRET: &str = "my-app-secret";

fn test_config(app_secret: Option<&str>) -> Config {
    Config {
        gemini_api_key: "test-key".into(),
        gemini_model: "gemini-1.5-flash".into(),
        // Unroutable: any accidental outbound call fails fast.
        gemini_base: "http://127.0.0.1:9".into(),
        whatsapp_token: "test-token".into(),
        phone_number_id: "1098765".into(),
        verify_token: VERIFY_TOKEN.into(),
        app_secret: app_secret.map(String::from),
        owner_number: None,
        store_directory_url: None,
        store_directory_token: None,
        graph_api_base: "http://127.0.0.1:9".into(),
        bind_addr: "127.0.0.1:0".into(),
    }
}

fn test_router(app_secret: Option<&str>) -> axum::Router {
    whatsapp::router(Arc::new(RelayState::new(test_config(app_secret))))
}

fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(APP_SECRET.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── Handshake ──────────────────────────────────────────────────────────

#[tokio::test]
async fn handshake_echoes_challenge_on_match() {
    let app = test_router(None);
    let uri = format!(
        "/webhook?hub.mode=subscribe&hub.verify_token={}&hub.challenge=1158201444",
        VERIFY_TOKEN
    );
    let response = app
        .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "1158201444");
}

#[tokio::test]
async fn handshake_rejects_wrong_token() {
    let app = test_router(None);
    let response = app
        .oneshot(
            Request::get("/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn handshake_rejects_wrong_mode() {
    let app = test_router(None);
    let uri = format!(
        "/webhook?hub.mode=unsubscribe&hub.verify_token={}&hub.challenge=42",
        VERIFY_TOKEN
    );
    let response = app
        .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ── Notification POST ──────────────────────────────────────────────────

// Status-only payload: parses fine, extracts zero messages.
const STATUS_PAYLOAD: &str = r#"{
    "object": "whatsapp_business_account",
    "entry": [{"changes": [{"value": {"metadata": {"phone_number_id": "1098765"}}}]}]
}"#;

#[tokio::test]
async fn post_accepts_correctly_signed_payload() {
    let app = test_router(Some(APP_SECRET));
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .header("x-hub-signature-256", sign(STATUS_PAYLOAD.as_bytes()))
                .body(Body::from(STATUS_PAYLOAD))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_rejects_bad_signature() {
    let app = test_router(Some(APP_SECRET));
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .header("x-hub-signature-256", "sha256=0000")
                .body(Body::from(STATUS_PAYLOAD))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_rejects_unsigned_payload_when_secret_set() {
    let app = test_router(Some(APP_SECRET));
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(STATUS_PAYLOAD))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_acknowledges_malformed_json() {
    let app = test_router(Some(APP_SECRET));
    let body = "this is not json";
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("x-hub-signature-256", sign(body.as_bytes()))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    // Acknowledged and dropped — redelivery would not help.
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_without_secret_skips_signature_check() {
    let app = test_router(None);
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(STATUS_PAYLOAD))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
