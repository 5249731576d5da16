//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bounty_platform::{
    api::{create_router, AppState},
    config::Config,
    fallback::sample_bounties,
    integrations::memory::{MemoryAssetHost, MemoryIdentity, MemoryStore},
};
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const BOUNDARY: &str = "----platform-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub assets: Arc<MemoryAssetHost>,
    pub identity: Arc<MemoryIdentity>,
}

pub fn test_config() -> Config {
    Config {
        admin_api_key: Some(ADMIN_KEY.to_string()),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        ..Config::default()
    }
}

/// Router wired to in-memory services seeded with the sample bounties.
pub fn test_app() -> TestApp {
    test_app_with(|state| state)
}

pub fn test_app_with(customize: impl FnOnce(AppState) -> AppState) -> TestApp {
    let store = Arc::new(MemoryStore::with_bounties(sample_bounties()));
    let assets = Arc::new(MemoryAssetHost::new("test-secret"));
    let identity = Arc::new(MemoryIdentity::default());

    let state = AppState::new(test_config())
        .with_store(store.clone())
        .with_assets(assets.clone())
        .with_identity(identity.clone());

    TestApp {
        router: create_router(customize(state)),
        store,
        assets,
        identity,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Minimal multipart/form-data encoder.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// A complete, valid submission form for `user_id` and `bounty_id`.
pub fn submission_form(user_id: &str, bounty_id: &str) -> Form {
    Form::new()
        .text("userId", user_id)
        .text("name", "Ada Lovelace")
        .text("university", "University of London")
        .text("bountyId", bounty_id)
        .text("submissionLink", "https://github.com/ada/analytical-engine")
        .text("walletAddress", "0x52908400098527886E0F7030069857D2E4169EE7")
}
