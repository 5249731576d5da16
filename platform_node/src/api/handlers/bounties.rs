use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{ApiError, ApiQuery, ApiResult, AppState};
use crate::common::Error;
use crate::fallback::sample_bounties;
use crate::records::normalize_status;
use crate::types::Bounty;

/// Where a bounty list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BountySource {
    Airtable,
    Fallback,
}

/// Bounties plus their origin. `warning` explains a fallback.
#[derive(Debug, Clone)]
pub struct LoadedBounties {
    pub bounties: Vec<Bounty>,
    pub source: BountySource,
    pub warning: Option<String>,
}

/// Fetch every bounty, falling back to the sample set when the store is
/// missing or failing.
pub async fn load_bounties(state: &AppState) -> LoadedBounties {
    let Some(store) = state.store.as_deref() else {
        return LoadedBounties {
            bounties: sample_bounties(),
            source: BountySource::Fallback,
            warning: Some("Airtable is not configured; showing sample bounties".to_string()),
        };
    };

    match store.list_bounties().await {
        Ok(bounties) => LoadedBounties {
            bounties,
            source: BountySource::Airtable,
            warning: None,
        },
        Err(e) => {
            warn!("Falling back to sample bounties: {}", e);
            LoadedBounties {
                bounties: sample_bounties(),
                source: BountySource::Fallback,
                warning: Some(format!("Could not load bounties from Airtable ({e}); showing sample bounties")),
            }
        }
    }
}

/// `all` and empty values mean no filter
fn filter_value(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Query parameters for the bounty list
#[derive(Debug, Default, Deserialize)]
pub struct BountyFilters {
    pub status: Option<String>,
    pub category: Option<String>,
}

/// Response for the bounty list
#[derive(Debug, Serialize)]
pub struct BountyListResponse {
    pub bounties: Vec<Bounty>,
    pub count: usize,
    pub source: BountySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BountyResponse {
    pub bounty: Bounty,
    pub source: BountySource,
}

/// List bounties, optionally filtered by status and category
pub async fn list_bounties(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<BountyFilters>,
) -> Json<BountyListResponse> {
    let loaded = load_bounties(&state).await;

    let status = filter_value(filters.status.as_deref()).map(normalize_status);
    let category = filter_value(filters.category.as_deref());

    let bounties: Vec<Bounty> = loaded
        .bounties
        .into_iter()
        .filter(|b| status.map_or(true, |s| b.status == s))
        .filter(|b| category.map_or(true, |c| b.in_category(c)))
        .collect();

    Json(BountyListResponse {
        count: bounties.len(),
        bounties,
        source: loaded.source,
        warning: loaded.warning,
    })
}

/// Get one bounty by record id
pub async fn get_bounty(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BountyResponse>> {
    let sample = || sample_bounties().into_iter().find(|b| b.id == id);
    let not_found = || ApiError::from(Error::NotFound {
        kind: "bounty",
        id: id.clone(),
    });

    let Some(store) = state.store.as_deref() else {
        let bounty = sample().ok_or_else(not_found)?;
        return Ok(Json(BountyResponse {
            bounty,
            source: BountySource::Fallback,
        }));
    };

    match store.get_bounty(&id).await {
        Ok(Some(bounty)) => Ok(Json(BountyResponse {
            bounty,
            source: BountySource::Airtable,
        })),
        Ok(None) => Err(not_found()),
        // ids handed out by the fallback list stay resolvable
        Err(e) => match sample() {
            Some(bounty) => {
                warn!("Serving sample bounty {} after store error: {}", id, e);
                Ok(Json(BountyResponse {
                    bounty,
                    source: BountySource::Fallback,
                }))
            }
            None => Err(e.into()),
        },
    }
}
