use axum::{extract::State, response::Json};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::AppState;

/// Which integrations have credentials
#[derive(Debug, Serialize)]
pub struct IntegrationStatus {
    pub airtable: bool,
    pub cloudinary: bool,
    pub privy: bool,
}

impl IntegrationStatus {
    pub fn of(state: &AppState) -> Self {
        Self {
            airtable: state.store.is_some(),
            cloudinary: state.assets.is_some(),
            privy: state.identity.is_some(),
        }
    }
}

/// Response for the liveness check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub integrations: IntegrationStatus,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        integrations: IntegrationStatus::of(&state),
    })
}
