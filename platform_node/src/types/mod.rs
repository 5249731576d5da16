//! Data model shared by the API, search and integration layers.

mod bounty;
mod community;
mod submission;

pub use bounty::{Bounty, BountyStatus};
pub use community::{Activity, ActivityKind, LeaderboardEntry, Winner};
pub use submission::{Attachment, BountySubmission, Profile, SubmissionSummary};
