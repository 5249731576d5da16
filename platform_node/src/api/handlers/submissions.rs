use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, ConnectInfo, Multipart, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::errors::{ValidationError, ValidationErrors};
use crate::api::server::client_ip;
use crate::api::validation::{validate_required, validate_submission_link, validate_wallet_address};
use crate::api::{ApiError, ApiQuery, ApiResult, AppState};
use crate::common::Error;
use crate::submission::uploads::{IncomingFile, SkippedFile};
use crate::submission::{upload_files, SubmissionDraft};
use crate::types::Attachment;

/// Text fields and files of a multipart form
#[derive(Debug, Default)]
pub struct ParsedForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<IncomingFile>,
}

impl ParsedForm {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Upload exceeds the maximum request size");
    }
    ApiError::new(status.as_u16(), err.body_text())
}

/// Read every part of the form. Parts with a file name are files; empty file
/// inputs are ignored.
pub async fn read_form(mut multipart: Multipart) -> ApiResult<ParsedForm> {
    let mut form = ParsedForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.files.push(IncomingFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

fn validate_draft(form: &ParsedForm) -> ApiResult<SubmissionDraft> {
    let mut errors = ValidationErrors::new();
    let mut required = |field: &str| match validate_required(field, form.field(field)) {
        Ok(value) => value,
        Err(e) => {
            errors.push(e);
            String::new()
        }
    };

    let draft = SubmissionDraft {
        user_id: required("userId"),
        name: required("name"),
        university: required("university"),
        bounty_id: required("bountyId"),
        submission_link: required("submissionLink"),
        wallet_address: required("walletAddress"),
    };

    if !draft.submission_link.is_empty() {
        errors.check(validate_submission_link(&draft.submission_link));
    }
    if !draft.wallet_address.is_empty() {
        errors.check(validate_wallet_address(&draft.wallet_address));
    }

    errors.into_result()?;
    Ok(draft)
}

/// Response for an accepted submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    pub record_id: String,
    pub attachments: Vec<Attachment>,
    pub skipped_files: Vec<SkippedFile>,
}

/// Accept a submission form with up to three attachments
pub async fn create_submission(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<SubmissionResponse>)> {
    let form = read_form(multipart?).await?;

    let ip = client_ip(&headers, connect.map(|c| c.0));
    let user_id = form.field("userId").map(str::trim).filter(|u| !u.is_empty());
    state.rate_limiter.check_rate_limit(&ip, user_id)?;

    let draft = validate_draft(&form)?;
    let outcome = state.pipeline()?.submit(draft, form.files).await?;

    let message = if outcome.skipped_files.is_empty() {
        "Submission received".to_string()
    } else {
        format!(
            "Submission received; {} file(s) were not attached",
            outcome.skipped_files.len()
        )
    };

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            success: true,
            message,
            record_id: outcome.record_id,
            attachments: outcome.attachments,
            skipped_files: outcome.skipped_files,
        }),
    ))
}

/// Query parameters for the duplicate check
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckParams {
    pub user_id: Option<String>,
    pub bounty_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub submitted: bool,
}

/// Whether a user already submitted to a bounty
pub async fn check_submission(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CheckParams>,
) -> ApiResult<Json<CheckResponse>> {
    let mut errors = ValidationErrors::new();
    let user_id = validate_required("userId", params.user_id.as_deref());
    let bounty_id = validate_required("bountyId", params.bounty_id.as_deref());
    let (user_id, bounty_id) = match (user_id, bounty_id) {
        (Ok(u), Ok(b)) => (u, b),
        (u, b) => {
            errors.check(u.map(drop));
            errors.check(b.map(drop));
            return Err(errors.to_api_error());
        }
    };

    let store = state.store()?;
    let submitted = state.in_flight.is_pending(&user_id, &bounty_id)
        || store.submission_exists(&user_id, &bounty_id).await?;
    Ok(Json(CheckResponse { submitted }))
}

/// Response for a standalone upload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponse {
    pub attachments: Vec<Attachment>,
    pub skipped_files: Vec<SkippedFile>,
}

/// Upload files without creating a submission
pub async fn upload_attachments(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AttachmentResponse>> {
    let form = read_form(multipart?).await?;

    let ip = client_ip(&headers, connect.map(|c| c.0));
    let user_id = form.field("userId").map(str::trim).filter(|u| !u.is_empty());
    state.rate_limiter.check_rate_limit(&ip, user_id)?;

    if form.files.is_empty() {
        return Err(ValidationError::new("files", "At least one file is required").into());
    }

    let assets = state
        .assets
        .as_deref()
        .ok_or(Error::NotConfigured { service: "Cloudinary" })?;

    let outcome = upload_files(Some(assets), &state.config.upload_limits, form.files).await?;
    info!(
        "Uploaded {} attachment(s) for {}, {} skipped",
        outcome.attachments.len(),
        ip,
        outcome.skipped_files.len()
    );

    Ok(Json(AttachmentResponse {
        attachments: outcome.attachments,
        skipped_files: outcome.skipped_files,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> ParsedForm {
        ParsedForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: Vec::new(),
        }
    }

    #[test]
    fn draft_requires_every_field() {
        let err = validate_draft(&form(&[("name", "Ada")])).unwrap_err();
        assert_eq!(err.code, 422);
        let details = err.details.unwrap();
        let fields: Vec<&str> = details["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(
            fields,
            vec!["userId", "university", "bountyId", "submissionLink", "walletAddress"]
        );
    }

    #[test]
    fn draft_checks_link_and_wallet() {
        let err = validate_draft(&form(&[
            ("userId", "did:privy:1"),
            ("name", "Ada"),
            ("university", "MIT"),
            ("bountyId", "rec1"),
            ("submissionLink", "not a url"),
            ("walletAddress", "0x12"),
        ]))
        .unwrap_err();
        assert_eq!(err.details.unwrap()["errors"].as_array().unwrap().len(), 2);

        let draft = validate_draft(&form(&[
            ("userId", "did:privy:1"),
            ("name", " Ada "),
            ("university", "MIT"),
            ("bountyId", "rec1"),
            ("submissionLink", "https://example.com/work"),
            ("walletAddress", "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"),
        ]))
        .unwrap();
        assert_eq!(draft.name, "Ada");
    }
}
