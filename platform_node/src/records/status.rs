use crate::types::BountyStatus;

const OPEN: &[&str] = &[
    "open",
    "active",
    "available",
    "new",
    "todo",
    "to do",
    "not started",
    "live",
];

const IN_PROGRESS: &[&str] = &[
    "in progress",
    "inprogress",
    "in review",
    "review",
    "under review",
    "reviewing",
    "ongoing",
    "pending",
    "started",
    "working",
    "assigned",
    "judging",
];

const CLOSED: &[&str] = &[
    "closed",
    "done",
    "complete",
    "completed",
    "finished",
    "expired",
    "cancelled",
    "canceled",
    "archived",
    "awarded",
    "ended",
];

/// Map an upstream status label onto a canonical status.
///
/// Case, surrounding whitespace and the separators `-`, `_` and space are
/// ignored. Anything unrecognized is `open`.
pub fn normalize_status(raw: &str) -> BountyStatus {
    let key = canonical_key(raw);

    if IN_PROGRESS.contains(&key.as_str()) {
        BountyStatus::InProgress
    } else if CLOSED.contains(&key.as_str()) {
        BountyStatus::Closed
    } else {
        if !key.is_empty() && !OPEN.contains(&key.as_str()) {
            tracing::debug!("Unrecognized status label {:?}, treating as open", raw);
        }
        BountyStatus::Open
    }
}

fn canonical_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
