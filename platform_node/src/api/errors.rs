//! HTTP error responses for the bounty platform API

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

use crate::common::Error;

/// Error body returned by every route: `{error, details, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: u16,
    #[serde(rename = "error")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: i64,
}

impl ApiError {
    pub fn new(code: u16, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_details(code: u16, message: String, details: serde_json::Value) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    // Common error constructors
    pub fn bad_request(message: &str) -> Self {
        Self::new(400, message.to_string())
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(401, message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(404, message.to_string())
    }

    pub fn conflict(message: &str) -> Self {
        Self::new(409, message.to_string())
    }

    pub fn payload_too_large(message: &str) -> Self {
        Self::new(413, message.to_string())
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self::new(500, message.to_string())
    }

    pub fn service_unavailable(message: &str) -> Self {
        Self::new(503, message.to_string())
    }

    pub fn rate_limit_exceeded(limit: u32, window: u64, retry_after: u64) -> Self {
        Self::with_details(
            429,
            "Rate limit exceeded".to_string(),
            json!({
                "limit": limit,
                "window_seconds": window,
                "retry_after": retry_after
            }),
        )
    }

    pub fn validation_error(field: &str, reason: &str) -> Self {
        Self::with_details(
            422,
            "Validation error".to_string(),
            json!({
                "field": field,
                "reason": reason
            }),
        )
    }

    pub fn upstream(service: &str, status: u16, message: &str) -> Self {
        // 4xx from the provider is passed through, everything else is a gateway failure
        let code = if (400..500).contains(&status) { status } else { 502 };
        Self::with_details(
            code,
            format!("{service} request failed"),
            json!({
                "service": service,
                "status": status,
                "message": message
            }),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Validation error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Multiple validation errors
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Record the error of a failed check, if any.
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(e) = result {
            self.push(e);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> ApiResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_api_error())
        }
    }

    pub fn to_api_error(self) -> ApiError {
        ApiError::with_details(
            422,
            "Validation failed".to_string(),
            serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
        )
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(err);
        errors.to_api_error()
    }
}

/// Extractor rejections keep axum's status and message but use the JSON body.
macro_rules! impl_from_rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    Self::new(rejection.status().as_u16(), rejection.body_text())
                }
            }
        )+
    };
}

impl_from_rejection!(JsonRejection, QueryRejection, MultipartRejection);

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { field, reason } => Self::validation_error(&field, &reason),
            Error::DuplicateSubmission { .. } => Self::conflict(&err.to_string()),
            Error::NotFound { .. } => Self::not_found(&err.to_string()),
            Error::NotConfigured { .. } => Self::service_unavailable(&err.to_string()),
            Error::Upstream {
                service,
                status,
                message,
            } => {
                warn!("Upstream failure from {}: {} {}", service, status, message);
                Self::upstream(service, status, &message)
            }
            Error::Http(ref e) => {
                error!("Outbound request failed: {}", e);
                Self::with_details(
                    502,
                    "Upstream request failed".to_string(),
                    json!({ "message": e.to_string() }),
                )
            }
            Error::Config(_) | Error::Serialization(_) => {
                error!("Internal error: {}", err);
                Self::internal_server_error(&err.to_string())
            }
        }
    }
}
