//! In-memory service implementations for tests and local runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::cloudinary::{api_sign_request, SignatureAlgorithm};
use super::{AssetHost, BountyStore, IdentityProvider, SignedUpload};
use crate::common::{Error, Result};
use crate::submission::uploads::EncodedFile;
use crate::types::{Attachment, Bounty, BountySubmission, Profile, SubmissionSummary};

/// Bounties and submissions held in memory. Can be switched to fail every
/// call with a 503 to exercise fallback paths.
#[derive(Default)]
pub struct MemoryStore {
    bounties: RwLock<Vec<Bounty>>,
    submissions: RwLock<Vec<(String, BountySubmission)>>,
    unavailable: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with_bounties(bounties: Vec<Bounty>) -> Self {
        Self {
            bounties: RwLock::new(bounties),
            ..Default::default()
        }
    }

    pub async fn set_bounties(&self, bounties: Vec<Bounty>) {
        *self.bounties.write().await = bounties;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn submissions(&self) -> Vec<BountySubmission> {
        self.submissions
            .read()
            .await
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::upstream("Airtable", 503, "service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl BountyStore for MemoryStore {
    async fn list_bounties(&self) -> Result<Vec<Bounty>> {
        self.check_available()?;
        Ok(self.bounties.read().await.clone())
    }

    async fn get_bounty(&self, id: &str) -> Result<Option<Bounty>> {
        self.check_available()?;
        Ok(self.bounties.read().await.iter().find(|b| b.id == id).cloned())
    }

    async fn submission_exists(&self, user_id: &str, bounty_id: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .submissions
            .read()
            .await
            .iter()
            .any(|(_, s)| s.user_id == user_id && s.bounty_id == bounty_id))
    }

    async fn create_submission(&self, submission: &BountySubmission) -> Result<String> {
        self.check_available()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::upstream("Airtable", 422, "Unknown field name: \"Attachments\""));
        }

        let mut submissions = self.submissions.write().await;
        let id = format!("rec{:04}", submissions.len() + 1);
        submissions.push((id.clone(), submission.clone()));
        Ok(id)
    }

    async fn submissions_for_user(&self, user_id: &str) -> Result<Vec<SubmissionSummary>> {
        self.check_available()?;
        Ok(self
            .submissions
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.user_id == user_id)
            .map(|(id, s)| SubmissionSummary {
                id: id.clone(),
                bounty_id: s.bounty_id.clone(),
                submission_link: s.submission_link.clone(),
                submitted_at: None,
                attachment_urls: s.attachments.iter().map(|a| a.url.clone()).collect(),
            })
            .collect())
    }

    async fn probe(&self) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(vec!["Status".into(), "Title".into()])
    }
}

/// Records uploads instead of sending them anywhere.
pub struct MemoryAssetHost {
    api_secret: String,
    uploads: RwLock<Vec<Attachment>>,
    counter: AtomicUsize,
}

impl MemoryAssetHost {
    pub fn new(api_secret: &str) -> Self {
        Self {
            api_secret: api_secret.to_string(),
            uploads: RwLock::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub async fn uploads(&self) -> Vec<Attachment> {
        self.uploads.read().await.clone()
    }
}

#[async_trait]
impl AssetHost for MemoryAssetHost {
    fn sign(&self, mut params: BTreeMap<String, String>) -> SignedUpload {
        params
            .entry("timestamp".to_string())
            .or_insert_with(|| "1700000000".to_string());

        SignedUpload {
            signature: api_sign_request(&params, &self.api_secret, SignatureAlgorithm::Sha1),
            api_key: "memory-key".to_string(),
            cloud_name: "memory".to_string(),
            params,
        }
    }

    async fn upload(&self, file: &EncodedFile) -> Result<Attachment> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let attachment = Attachment {
            file_name: file.file_name.clone(),
            url: format!("https://assets.local/bounty-submissions/{n}-{}", file.file_name),
            public_id: format!("bounty-submissions/{n}"),
        };
        self.uploads.write().await.push(attachment.clone());
        Ok(attachment)
    }
}

#[derive(Default)]
pub struct MemoryIdentity {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl MemoryIdentity {
    pub async fn insert(&self, profile: Profile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "user",
                id: user_id.to_string(),
            })
    }

    async fn set_metadata(&self, user_id: &str, metadata: Map<String, Value>) -> Result<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(user_id).ok_or_else(|| Error::NotFound {
            kind: "user",
            id: user_id.to_string(),
        })?;
        profile.custom_metadata = metadata;
        Ok(profile.clone())
    }
}
