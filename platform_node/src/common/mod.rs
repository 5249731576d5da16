mod error;

pub use error::{PlatformError as Error, Result};
