//! Setup diagnostics. Open until an admin key is configured.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use tracing::warn;

use crate::api::handlers::status::IntegrationStatus;
use crate::api::{ApiResult, AppState};
use crate::config::Config;
use crate::records::fields::bounty_columns;

#[derive(Debug, Serialize)]
pub struct EnvVarStatus {
    pub name: &'static str,
    pub set: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLimitsReport {
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
    pub max_files: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReport {
    pub variables: Vec<EnvVarStatus>,
    pub integrations: IntegrationStatus,
    pub upload_limits: UploadLimitsReport,
}

/// Which environment variables are set. Values are never returned.
pub async fn config_report(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ConfigReport>> {
    state.require_admin_if_configured(&headers)?;

    let limits = state.config.upload_limits;
    Ok(Json(ConfigReport {
        variables: Config::env_report()
            .into_iter()
            .map(|(name, set)| EnvVarStatus { name, set })
            .collect(),
        integrations: IntegrationStatus::of(&state),
        upload_limits: UploadLimitsReport {
            max_file_bytes: limits.max_file_bytes,
            max_total_bytes: limits.max_total_bytes,
            max_files: limits.max_files,
        },
    }))
}

/// Result of probing the bounties table
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtableProbe {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounties_table: Option<String>,
    pub fields: Vec<String>,
    /// Expected columns for which none of the accepted names was seen
    pub missing: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const EXPECTED_COLUMNS: &[(&str, &[&str])] = &[
    ("title", bounty_columns::TITLE),
    ("description", bounty_columns::DESCRIPTION),
    ("reward", bounty_columns::REWARD),
    ("deadline", bounty_columns::DEADLINE),
    ("category", bounty_columns::CATEGORY),
    ("status", bounty_columns::STATUS),
];

fn missing_columns(fields: &[String]) -> Vec<&'static str> {
    EXPECTED_COLUMNS
        .iter()
        .filter(|(_, names)| !names.iter().any(|n| fields.iter().any(|f| f == n)))
        .map(|(field, _)| *field)
        .collect()
}

/// Check Airtable connectivity and report the column names it returns
pub async fn airtable_probe(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AirtableProbe>> {
    state.require_admin_if_configured(&headers)?;

    let store = state.store()?;
    let bounties_table = state.config.airtable.as_ref().map(|a| a.bounties_table.clone());

    let probe = match store.probe().await {
        Ok(fields) => AirtableProbe {
            connected: true,
            bounties_table,
            missing: missing_columns(&fields),
            fields,
            error: None,
        },
        Err(e) => {
            warn!("Airtable probe failed: {}", e);
            AirtableProbe {
                connected: false,
                bounties_table,
                fields: Vec::new(),
                missing: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    };

    Ok(Json(probe))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typo_columns_count_as_present() {
        let fields: Vec<String> = ["Tiltle", "Rewards", "Select", "Details"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(missing_columns(&fields), vec!["deadline", "category"]);
    }
}
