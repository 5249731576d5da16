//! Cloudinary signed uploads.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::info;

use super::{check_response, AssetHost};
use crate::common::{Error, Result};
use crate::config::CloudinaryConfig;
use crate::submission::uploads::EncodedFile;
use crate::types::Attachment;

const SERVICE: &str = "Cloudinary";

/// Parameters that are sent with an upload but never signed.
const UNSIGNED_PARAMS: &[&str] = &["file", "cloud_name", "resource_type", "api_key"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(Error::Config(format!(
                "unsupported Cloudinary signature algorithm '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => f.write_str("sha1"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Everything a browser needs to upload straight to Cloudinary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub signature: String,
    pub api_key: String,
    pub cloud_name: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

/// Sign `params` the way Cloudinary verifies them: sorted `key=value` pairs
/// joined by `&`, secret appended, hex digest.
pub fn api_sign_request(
    params: &BTreeMap<String, String>,
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let to_sign = params
        .iter()
        .filter(|(key, value)| !UNSIGNED_PARAMS.contains(&key.as_str()) && !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let payload = format!("{to_sign}{api_secret}");
    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(payload.as_bytes())),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
    }
}

pub struct CloudinaryClient {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/auto/upload", self.config.api_url, self.config.cloud_name)
    }
}

#[async_trait]
impl AssetHost for CloudinaryClient {
    fn sign(&self, mut params: BTreeMap<String, String>) -> SignedUpload {
        params
            .entry("timestamp".to_string())
            .or_insert_with(|| Utc::now().timestamp().to_string());

        SignedUpload {
            signature: api_sign_request(
                &params,
                &self.config.api_secret,
                self.config.signature_algorithm,
            ),
            api_key: self.config.api_key.clone(),
            cloud_name: self.config.cloud_name.clone(),
            params,
        }
    }

    async fn upload(&self, file: &EncodedFile) -> Result<Attachment> {
        let mut params = BTreeMap::new();
        params.insert("folder".to_string(), self.config.upload_folder.clone());
        let signed = self.sign(params);

        let mut form: Vec<(&str, &str)> = signed
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        form.push(("file", file.data_uri.as_str()));
        form.push(("api_key", signed.api_key.as_str()));
        form.push(("signature", signed.signature.as_str()));

        let response = self
            .client
            .post(self.upload_url())
            .form(&form)
            .send()
            .await?;
        let uploaded: UploadResponse = check_response(SERVICE, response).await?.json().await?;

        info!("Uploaded {} as {}", file.file_name, uploaded.public_id);
        Ok(Attachment {
            file_name: file.file_name.clone(),
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documented_params() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("timestamp".to_string(), "1315060510".to_string()),
            ("public_id".to_string(), "sample_image".to_string()),
            (
                "eager".to_string(),
                "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string(),
            ),
        ])
    }

    #[test]
    fn sha1_signature_matches_reference() {
        assert_eq!(
            api_sign_request(&documented_params(), "abcd", SignatureAlgorithm::Sha1),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn sha256_signature_matches_reference() {
        assert_eq!(
            api_sign_request(&documented_params(), "abcd", SignatureAlgorithm::Sha256),
            "cc927e1290f9e3ae4c1a741eda21a4630b4ce80f9ce0bc0296337d25cf40f91e"
        );
    }

    #[test]
    fn unsigned_and_empty_params_are_ignored() {
        let mut params = documented_params();
        params.insert("api_key".into(), "123".into());
        params.insert("file".into(), "data:image/png;base64,AAAA".into());
        params.insert("folder".into(), String::new());

        assert_eq!(
            api_sign_request(&params, "abcd", SignatureAlgorithm::Sha1),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn sign_adds_timestamp() {
        let client = CloudinaryClient::new(
            CloudinaryConfig {
                api_url: "https://api.cloudinary.com/v1_1".into(),
                cloud_name: "demo".into(),
                api_key: "key".into(),
                api_secret: "secret".into(),
                upload_folder: "bounty-submissions".into(),
                signature_algorithm: SignatureAlgorithm::Sha1,
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let signed = client.sign(BTreeMap::new());
        assert!(signed.params.contains_key("timestamp"));
        assert_eq!(signed.signature.len(), 40);
        assert_eq!(client.upload_url(), "https://api.cloudinary.com/v1_1/demo/auto/upload");
    }

    #[test]
    fn algorithm_parsing() {
        assert_eq!("SHA256".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha256);
        assert!("md5".parse::<SignatureAlgorithm>().is_err());
    }
}
