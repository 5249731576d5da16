pub mod analytics;
pub mod bounties;
pub mod community;
pub mod debug;
pub mod media;
pub mod profile;
pub mod search;
pub mod status;
pub mod submissions;
pub mod sync;
