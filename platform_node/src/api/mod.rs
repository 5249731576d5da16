//! HTTP surface of the bounty platform.

pub mod errors;
pub mod extract;
pub mod handlers;
pub mod rate_limiter;
pub mod server;
pub mod validation;

pub use errors::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiQuery};
pub use server::{create_router, start_api_server, AppState};
