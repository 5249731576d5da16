//! Submission pipeline: duplicate check, attachment screening, upload to the
//! asset host, and the final record write.
//!
//! There is no transaction between the uploads and the record write. When
//! the write fails after files were uploaded the asset ids are logged and
//! the error is returned as is; nothing is cleaned up.

pub mod uploads;

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::common::{Error, Result};
use crate::integrations::{AssetHost, BountyStore};
use crate::types::{Attachment, BountyStatus, BountySubmission};
use uploads::{encode, screen, IncomingFile, SkippedFile, UploadLimits};

/// Attachment URLs stored per submission record.
pub const MAX_ATTACHMENTS: usize = 3;

/// Validated text fields of a submission form.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionDraft {
    pub user_id: String,
    pub name: String,
    pub university: String,
    pub bounty_id: String,
    pub submission_link: String,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub record_id: String,
    pub attachments: Vec<Attachment>,
    pub skipped_files: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub attachments: Vec<Attachment>,
    pub skipped_files: Vec<SkippedFile>,
}

/// `(user id, bounty id)` pairs with a submission currently being processed.
#[derive(Debug, Clone, Default)]
pub struct InFlightSubmissions {
    pairs: Arc<DashMap<(String, String), ()>>,
}

/// Releases its pair when dropped.
#[derive(Debug)]
pub struct InFlightTicket {
    pairs: Arc<DashMap<(String, String), ()>>,
    key: (String, String),
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.pairs.remove(&self.key);
    }
}

impl InFlightSubmissions {
    pub fn try_acquire(&self, user_id: &str, bounty_id: &str) -> Option<InFlightTicket> {
        let key = (user_id.to_string(), bounty_id.to_string());
        match self.pairs.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightTicket {
                    pairs: self.pairs.clone(),
                    key,
                })
            }
        }
    }

    /// Whether a submission for the pair is being processed right now.
    pub fn is_pending(&self, user_id: &str, bounty_id: &str) -> bool {
        self.pairs
            .contains_key(&(user_id.to_string(), bounty_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

pub struct SubmissionPipeline<'a> {
    pub store: &'a dyn BountyStore,
    pub assets: Option<&'a dyn AssetHost>,
    pub limits: UploadLimits,
    pub in_flight: &'a InFlightSubmissions,
}

impl SubmissionPipeline<'_> {
    pub async fn submit(
        &self,
        draft: SubmissionDraft,
        files: Vec<IncomingFile>,
    ) -> Result<SubmissionOutcome> {
        let duplicate = || Error::DuplicateSubmission {
            user_id: draft.user_id.clone(),
            bounty_id: draft.bounty_id.clone(),
        };

        let _ticket = self
            .in_flight
            .try_acquire(&draft.user_id, &draft.bounty_id)
            .ok_or_else(duplicate)?;

        let bounty = self
            .store
            .get_bounty(&draft.bounty_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: "bounty",
                id: draft.bounty_id.clone(),
            })?;
        if bounty.status == BountyStatus::Closed {
            return Err(Error::validation(
                "bountyId",
                "this bounty is closed and no longer accepts submissions",
            ));
        }

        if self
            .store
            .submission_exists(&draft.user_id, &draft.bounty_id)
            .await?
        {
            info!(
                "Rejected duplicate submission from {} for {}",
                draft.user_id, draft.bounty_id
            );
            return Err(duplicate());
        }

        let upload = upload_files(self.assets, &self.limits, files).await?;

        let submission = BountySubmission {
            user_id: draft.user_id.clone(),
            name: draft.name,
            university: draft.university,
            bounty_id: draft.bounty_id.clone(),
            submission_link: draft.submission_link,
            wallet_address: draft.wallet_address,
            attachments: upload.attachments.clone(),
        };

        let record_id = match self.store.create_submission(&submission).await {
            Ok(id) => id,
            Err(e) => {
                if !upload.attachments.is_empty() {
                    let orphaned: Vec<&str> = upload
                        .attachments
                        .iter()
                        .map(|a| a.public_id.as_str())
                        .collect();
                    error!(
                        "Submission write failed after uploading {:?}: {}",
                        orphaned, e
                    );
                }
                return Err(e);
            }
        };

        info!(
            "Accepted submission {} from {} for {} with {} attachment(s), {} skipped",
            record_id,
            submission.user_id,
            submission.bounty_id,
            upload.attachments.len(),
            upload.skipped_files.len()
        );

        Ok(SubmissionOutcome {
            record_id,
            attachments: upload.attachments,
            skipped_files: upload.skipped_files,
        })
    }
}

/// Screen and upload files one at a time. An upload failure aborts the
/// batch. Without an asset host every accepted file is reported as skipped.
pub async fn upload_files(
    assets: Option<&dyn AssetHost>,
    limits: &UploadLimits,
    files: Vec<IncomingFile>,
) -> Result<UploadOutcome> {
    let screened = screen(files, limits);
    let mut skipped_files = screened.skipped;
    let mut attachments = Vec::with_capacity(screened.accepted.len());

    let Some(assets) = assets else {
        if !screened.accepted.is_empty() {
            warn!("Asset host not configured, skipping {} file(s)", screened.accepted.len());
        }
        skipped_files.extend(screened.accepted.into_iter().map(|(file, _)| SkippedFile {
            file_name: file.file_name,
            reason: "file uploads are not configured".to_string(),
        }));
        return Ok(UploadOutcome {
            attachments,
            skipped_files,
        });
    };

    for (file, mime) in &screened.accepted {
        let encoded = encode(file, mime);
        match assets.upload(&encoded).await {
            Ok(attachment) => attachments.push(attachment),
            Err(e) => {
                error!("Upload of {} failed: {}", file.file_name, e);
                return Err(e);
            }
        }
    }

    Ok(UploadOutcome {
        attachments,
        skipped_files,
    })
}
