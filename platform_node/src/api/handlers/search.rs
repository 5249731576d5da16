use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::handlers::bounties::{load_bounties, BountySource};
use crate::api::{ApiError, ApiQuery, ApiResult, AppState};
use crate::fallback::{sample_activities, sample_winners};
use crate::records::normalize_status;
use crate::search::{self as engine, ContentType, SearchHit, SearchItem, SearchQuery};

/// Query parameters for search
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// Response for a search
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub source: BountySource,
}

/// Rank bounties, winners and activities against a free-text query
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let text = params.q.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::validation_error("q", "Search query is required"));
    }

    let content_type = params
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("all"))
        .map(str::parse::<ContentType>)
        .transpose()?;
    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        .map(normalize_status);

    let loaded = load_bounties(&state).await;
    let winners = sample_winners();
    let activities = sample_activities();

    let items: Vec<SearchItem> = loaded
        .bounties
        .iter()
        .map(SearchItem::from)
        .chain(winners.iter().map(SearchItem::from))
        .chain(activities.iter().map(SearchItem::from))
        .collect();

    let query = SearchQuery {
        text: text.to_string(),
        content_type,
        status,
        limit: params.limit,
    };
    let results = engine::search(&items, &query);
    debug!("Search {:?} matched {} of {} items", text, results.len(), items.len());

    state.analytics.write().await.record(text, results.len());

    Ok(Json(SearchResponse {
        query: text.to_string(),
        total: results.len(),
        results,
        source: loaded.source,
    }))
}
