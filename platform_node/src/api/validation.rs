//! Request validation utilities for the bounty platform API

use crate::api::errors::ValidationError;
use serde_json::{Map, Value};
use url::Url;

const MAX_TEXT_LEN: usize = 500;
const MAX_METADATA_KEYS: usize = 50;

/// Validate a required free-text field
pub fn validate_required(field: &str, value: Option<&str>) -> Result<String, ValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();

    if trimmed.is_empty() {
        return Err(ValidationError::new(field, format!("{field} is required")));
    }

    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::new(
            field,
            format!("{field} cannot exceed {MAX_TEXT_LEN} characters"),
        ));
    }

    Ok(trimmed.to_string())
}

/// Validate a submission link: absolute http(s) URL with a host
pub fn validate_submission_link(link: &str) -> Result<(), ValidationError> {
    let invalid = |message: &str| {
        ValidationError::new("submissionLink", message).with_value(Value::String(link.to_string()))
    };

    let url = Url::parse(link).map_err(|_| invalid("Submission link must be a valid URL"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("Submission link must use http or https"));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("Submission link must include a host"));
    }

    Ok(())
}

/// Validate wallet address format
///
/// Any chain's address is accepted as long as it has no whitespace; EVM-style
/// `0x` addresses must also be 42 hex characters.
pub fn validate_wallet_address(address: &str) -> Result<(), ValidationError> {
    let invalid = |message: &str| {
        ValidationError::new("walletAddress", message)
            .with_value(Value::String(address.to_string()))
    };

    if address.is_empty() {
        return Err(invalid("Wallet address cannot be empty"));
    }

    if address.chars().any(char::is_whitespace) {
        return Err(invalid("Wallet address cannot contain whitespace"));
    }

    if let Some(hex) = address.strip_prefix("0x") {
        if address.len() != 42 {
            return Err(invalid("Address must be 42 characters long (including '0x')"));
        }

        if !is_valid_hex(hex) {
            return Err(invalid("Address contains invalid hex characters"));
        }
    }

    Ok(())
}

/// Validate a custom metadata patch: a flat object of scalar values
pub fn validate_metadata(metadata: &Map<String, Value>) -> Result<(), ValidationError> {
    if metadata.is_empty() {
        return Err(ValidationError::new("metadata", "Metadata cannot be empty"));
    }

    if metadata.len() > MAX_METADATA_KEYS {
        return Err(ValidationError::new(
            "metadata",
            format!("Metadata cannot have more than {MAX_METADATA_KEYS} keys"),
        ));
    }

    for (key, value) in metadata {
        if key.trim().is_empty() {
            return Err(ValidationError::new("metadata", "Metadata keys cannot be empty"));
        }

        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(ValidationError::new(
                "metadata",
                format!("Metadata value for '{key}' must be a string, number, boolean or null"),
            )
            .with_value(value.clone()));
        }
    }

    Ok(())
}

/// Check if string is valid hex
fn is_valid_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}
