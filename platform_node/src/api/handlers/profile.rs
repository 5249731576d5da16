use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::api::validation::{validate_metadata, validate_required};
use crate::api::{ApiJson, ApiResult, AppState};
use crate::types::{Profile, SubmissionSummary};

/// Get a user's profile from the identity provider
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Profile>> {
    let profile = state.identity()?.get_profile(&user_id).await?;
    Ok(Json(profile))
}

/// Response for a user's submission history
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubmissionsResponse {
    pub user_id: String,
    pub submissions: Vec<SubmissionSummary>,
    pub count: usize,
}

pub async fn get_user_submissions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserSubmissionsResponse>> {
    let submissions = state.store()?.submissions_for_user(&user_id).await?;
    Ok(Json(UserSubmissionsResponse {
        user_id,
        count: submissions.len(),
        submissions,
    }))
}

/// Metadata patch for a user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Keys in `patch` overwrite existing ones; a `null` value removes the key.
pub fn merge_metadata(existing: &Map<String, Value>, patch: Map<String, Value>) -> Map<String, Value> {
    let mut merged = existing.clone();
    for (key, value) in patch {
        if value.is_null() {
            merged.remove(&key);
        } else {
            merged.insert(key, value);
        }
    }
    merged
}

/// Merge custom metadata into a user's profile
pub async fn update_profile(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    let user_id = validate_required("userId", request.user_id.as_deref())?;
    validate_metadata(&request.metadata)?;

    let identity = state.identity()?;
    let current = identity.get_profile(&user_id).await?;
    let merged = merge_metadata(&current.custom_metadata, request.metadata);

    let profile = identity.set_metadata(&user_id, merged).await?;
    info!("Updated profile metadata for {}", user_id);
    Ok(Json(profile))
}
