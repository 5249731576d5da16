use serde::{Deserialize, Serialize};

/// An uploaded file that made it onto the asset host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub url: String,
    pub public_id: String,
}

/// A validated submission, ready to be written to the submissions table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountySubmission {
    pub user_id: String,
    pub name: String,
    pub university: String,
    pub bounty_id: String,
    pub submission_link: String,
    pub wallet_address: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A submission as read back from the submissions table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: String,
    pub bounty_id: String,
    pub submission_link: String,
    pub submitted_at: Option<String>,
    pub attachment_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub custom_metadata: serde_json::Map<String, serde_json::Value>,
}
