use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::api::errors::ValidationError;
use crate::api::{ApiResult, AppState};
use crate::common::Error;
use crate::integrations::SignedUpload;

/// Upload parameters a browser wants signed
#[derive(Debug, Default, Deserialize)]
pub struct SignatureRequest {
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

fn stringify_params(params: BTreeMap<String, Value>) -> Result<BTreeMap<String, String>, ValidationError> {
    params
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(ValidationError::new(
                        "params",
                        format!("Parameter '{key}' must be a scalar value"),
                    )
                    .with_value(other))
                }
            };
            Ok((key, value))
        })
        .collect()
}

/// Sign parameters for a direct browser upload. A `timestamp` is added when
/// absent and the configured upload folder is used by default.
pub async fn sign_upload(
    State(state): State<AppState>,
    body: Option<Json<SignatureRequest>>,
) -> ApiResult<Json<SignedUpload>> {
    let assets = state
        .assets
        .as_deref()
        .ok_or(Error::NotConfigured { service: "Cloudinary" })?;

    let request = body.map(|Json(r)| r).unwrap_or_default();
    let mut params = stringify_params(request.params)?;

    if let Some(cloudinary) = &state.config.cloudinary {
        params
            .entry("folder".to_string())
            .or_insert_with(|| cloudinary.upload_folder.clone());
    }

    Ok(Json(assets.sign(params)))
}
