use thiserror::Error;

/// Errors raised by the service and integration layers.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("You have already submitted to this bounty")]
    DuplicateSubmission { user_id: String, bounty_id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{service} returned {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlatformError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn upstream(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            status,
            message: message.into(),
        }
    }

    /// True when the error came from a remote service rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
