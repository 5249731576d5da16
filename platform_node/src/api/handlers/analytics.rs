use axum::{extract::State, http::HeaderMap, Json};

use crate::api::{ApiResult, AppState};
use crate::search::analytics::AnalyticsSummary;

/// Search analytics since start up (admin only)
pub async fn search_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AnalyticsSummary>> {
    state.require_admin(&headers)?;
    let summary = state.analytics.read().await.summary();
    Ok(Json(summary))
}
