//! Clients for the third-party services the platform is built on.
//!
//! Each service sits behind a trait so the API layer can be driven by the
//! in-memory implementations in [`memory`] during tests.

pub mod airtable;
pub mod cloudinary;
pub mod memory;
pub mod privy;

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Response;
use serde_json::{Map, Value};

use crate::common::{Error, Result};
use crate::submission::uploads::EncodedFile;
use crate::types::{Attachment, Bounty, BountySubmission, Profile, SubmissionSummary};

pub use airtable::AirtableClient;
pub use cloudinary::{CloudinaryClient, SignedUpload};
pub use privy::PrivyClient;

/// Spreadsheet-backed storage for bounties and submissions.
#[async_trait]
pub trait BountyStore: Send + Sync {
    async fn list_bounties(&self) -> Result<Vec<Bounty>>;

    async fn get_bounty(&self, id: &str) -> Result<Option<Bounty>>;

    /// Whether `user_id` already has a submission for `bounty_id`.
    async fn submission_exists(&self, user_id: &str, bounty_id: &str) -> Result<bool>;

    /// Write a submission and return the new record id.
    async fn create_submission(&self, submission: &BountySubmission) -> Result<String>;

    async fn submissions_for_user(&self, user_id: &str) -> Result<Vec<SubmissionSummary>>;

    /// Column names seen in the first bounty row, for the setup page.
    async fn probe(&self) -> Result<Vec<String>>;
}

/// Signed file hosting for submission attachments.
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Sign upload parameters for a direct browser upload.
    fn sign(&self, params: BTreeMap<String, String>) -> SignedUpload;

    async fn upload(&self, file: &EncodedFile) -> Result<Attachment>;
}

/// Identity provider holding user profiles.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Profile>;

    /// Replace the user's custom metadata.
    async fn set_metadata(&self, user_id: &str, metadata: Map<String, Value>) -> Result<Profile>;
}

/// Turn a non-success response into [`Error::Upstream`], keeping the
/// provider's own error message when the body carries one.
pub(crate) async fn check_response(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body).unwrap_or_else(|| {
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.chars().take(500).collect()
        }
    });

    tracing::warn!("{} request failed with {}: {}", service, status, message);
    Err(Error::upstream(service, status.as_u16(), message))
}

/// Extract the human-readable part of the error bodies used by the three
/// providers: `{"error": "..."}`, `{"error": {"message": "..."}}` and
/// `{"message": "..."}`.
fn upstream_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    match value.get("error") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(Value::Object(obj)) => {
            if let Some(Value::String(s)) = obj.get("message") {
                return Some(s.clone());
            }
            if let Some(Value::String(s)) = obj.get("type") {
                return Some(s.clone());
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_provider_error_shapes() {
        assert_eq!(
            upstream_message(r#"{"error":{"type":"INVALID_PERMISSIONS","message":"No access"}}"#),
            Some("No access".to_string())
        );
        assert_eq!(
            upstream_message(r#"{"error":"NOT_FOUND"}"#),
            Some("NOT_FOUND".to_string())
        );
        assert_eq!(
            upstream_message(r#"{"error":{"message":"Invalid Signature"}}"#),
            Some("Invalid Signature".to_string())
        );
        assert_eq!(
            upstream_message(r#"{"message":"Invalid app ID"}"#),
            Some("Invalid app ID".to_string())
        );
        assert_eq!(upstream_message("<html>bad gateway</html>"), None);
    }
}
