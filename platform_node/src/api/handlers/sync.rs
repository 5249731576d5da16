use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ApiError, ApiResult, AppState};
use crate::sync::{verify_webhook_signature, BountyDiff};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Response for a sync run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    #[serde(flatten)]
    pub diff: BountyDiff,
    pub total: usize,
    pub synced_at: DateTime<Utc>,
}

fn webhook_authorized(state: &AppState, headers: &HeaderMap, body: &[u8]) -> bool {
    let (Some(secret), Some(signature)) = (
        state.config.webhook_secret.as_deref(),
        headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()),
    ) else {
        return false;
    };

    let valid = verify_webhook_signature(secret, body, signature);
    if !valid {
        warn!("Rejected webhook with an invalid signature");
    }
    valid
}

/// Refetch bounties and report what changed since the previous sync
pub async fn sync_bounties(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SyncResponse>> {
    if !state.admin_authorized(&headers) && !webhook_authorized(&state, &headers, &body) {
        return Err(ApiError::unauthorized(
            "A valid x-admin-key or x-webhook-signature header is required",
        ));
    }

    let bounties = state.store()?.list_bounties().await?;

    let mut tracker = state.sync.write().await;
    let diff = tracker.apply(&bounties)?;
    let synced_at = tracker.last_synced().unwrap_or_else(Utc::now);
    drop(tracker);

    info!(
        "Synced {} bounties: {} added, {} removed, {} changed",
        bounties.len(),
        diff.added.len(),
        diff.removed.len(),
        diff.changed.len()
    );

    Ok(Json(SyncResponse {
        diff,
        total: bounties.len(),
        synced_at,
    }))
}
