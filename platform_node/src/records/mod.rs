//! Reconciles inconsistent spreadsheet records into the local data model.
//!
//! The bounties table has drifted over time: columns were renamed, some
//! carry typos (`Tiltle`, `Rewards`) and the status column is sometimes a
//! single-select called `Select`. Every lookup therefore goes through a list
//! of candidate column names, and every status goes through
//! [`status::normalize_status`].

pub mod fields;
pub mod status;

use serde::{Deserialize, Serialize};

pub use fields::{bounty_from_record, submission_from_record};
pub use status::normalize_status;

/// A raw row as returned by the Airtable REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}
