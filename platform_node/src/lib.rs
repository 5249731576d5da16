//! Bounty Platform API.
//!
//! HTTP backend for listing bounties, searching them, accepting submissions
//! with file attachments, and serving community data. Bounties and
//! submissions live in Airtable, attachments in Cloudinary and user profiles
//! in Privy; each sits behind a trait in [`integrations`] so the router can
//! run against in-memory implementations.

pub mod api;
pub mod common;
pub mod config;
pub mod fallback;
pub mod integrations;
pub mod records;
pub mod search;
pub mod submission;
pub mod sync;
pub mod types;

pub use common::{Error, Result};
