//! Bounty change detection and webhook verification.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::common::{Error, Result};
use crate::types::Bounty;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BountyDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl BountyDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Last-known bounty snapshot, keyed by id.
#[derive(Debug, Default)]
pub struct SyncTracker {
    fingerprints: HashMap<String, String>,
    last_synced: Option<DateTime<Utc>>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `bounties` against the snapshot, then replace the snapshot.
    /// Ids in each list are sorted.
    pub fn apply(&mut self, bounties: &[Bounty]) -> Result<BountyDiff> {
        let mut next = HashMap::with_capacity(bounties.len());
        for bounty in bounties {
            next.insert(bounty.id.clone(), fingerprint(bounty)?);
        }

        let mut diff = BountyDiff::default();
        for (id, print) in &next {
            match self.fingerprints.get(id) {
                None => diff.added.push(id.clone()),
                Some(previous) if previous != print => diff.changed.push(id.clone()),
                Some(_) => {}
            }
        }
        diff.removed = self
            .fingerprints
            .keys()
            .filter(|id| !next.contains_key(*id))
            .cloned()
            .collect();

        diff.added.sort();
        diff.changed.sort();
        diff.removed.sort();

        self.fingerprints = next;
        self.last_synced = Some(Utc::now());
        Ok(diff)
    }

    pub fn tracked(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.last_synced
    }
}

fn fingerprint(bounty: &Bounty) -> Result<String> {
    let json = serde_json::to_vec(bounty)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// Check an `x-webhook-signature` header of the form `sha256=<hex>` against
/// the HMAC-SHA256 of `body`.
pub fn verify_webhook_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(given) = header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(given) = hex::decode(given) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&given).is_ok()
}

/// Header value a sender would attach to `body`.
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Config(format!("invalid webhook secret: {e}")))?;
    mac.update(body);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}
