//! Service configuration.
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (`platform.toml` unless another path is given), then environment
//! variables. A `.env` file is loaded into the environment first. Every
//! integration whose credentials are missing is left disabled instead of
//! failing start up, so the bounty list can still be served from fallback
//! data.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{Error, Result};
use crate::integrations::cloudinary::SignatureAlgorithm;
use crate::submission::uploads::UploadLimits;

const MB: u64 = 1024 * 1024;

/// Environment variables reported by the debug endpoint.
pub const KNOWN_ENV_VARS: &[&str] = &[
    "AIRTABLE_PERSONAL_ACCESS_TOKEN",
    "AIRTABLE_BASE_ID",
    "AIRTABLE_BOUNTIES_TABLE_ID",
    "AIRTABLE_SUBMISSIONS_TABLE_ID",
    "CLOUDINARY_CLOUD_NAME",
    "CLOUDINARY_API_KEY",
    "CLOUDINARY_API_SECRET",
    "PRIVY_APP_ID",
    "PRIVY_APP_SECRET",
    "ADMIN_API_KEY",
    "WEBHOOK_SECRET",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` allows any origin.
    pub cors_allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableConfig {
    pub api_url: String,
    pub access_token: String,
    pub base_id: String,
    pub bounties_table: String,
    pub submissions_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub api_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_folder: String,
    pub signature_algorithm: SignatureAlgorithm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivyConfig {
    pub api_url: String,
    pub app_id: String,
    pub app_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub airtable: Option<AirtableConfig>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub privy: Option<PrivyConfig>,
    pub admin_api_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub upload_limits: UploadLimits,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
                cors_allowed_origins: None,
            },
            airtable: None,
            cloudinary: None,
            privy: None,
            admin_api_key: None,
            webhook_secret: None,
            upload_limits: UploadLimits::default(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Flat view of every setting, as it comes out of the `config` layers.
#[derive(Debug, Deserialize)]
struct RawSettings {
    host: String,
    port: u16,
    http_timeout_secs: u64,
    max_file_size_mb: u64,
    max_total_upload_mb: u64,
    cors_allowed_origins: String,

    airtable_api_url: String,
    airtable_personal_access_token: Option<String>,
    airtable_base_id: Option<String>,
    airtable_bounties_table_id: String,
    airtable_submissions_table_id: String,

    cloudinary_api_url: String,
    cloudinary_cloud_name: Option<String>,
    cloudinary_api_key: Option<String>,
    cloudinary_api_secret: Option<String>,
    cloudinary_upload_folder: String,
    cloudinary_signature_algorithm: String,

    privy_api_url: String,
    privy_app_id: Option<String>,
    privy_app_secret: Option<String>,

    admin_api_key: Option<String>,
    webhook_secret: Option<String>,
}

impl Config {
    /// Load configuration from `.env`, the optional config file and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        if dotenv::dotenv().is_ok() {
            info!("Loaded environment from .env");
        }

        let mut builder = defaults(config::Config::builder())?;

        builder = match config_file {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("platform").required(false)),
        };

        let settings = builder
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let raw: RawSettings = settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        if raw.max_file_size_mb == 0 || raw.max_total_upload_mb == 0 {
            return Err(Error::Config("upload limits must be positive".to_string()));
        }
        if raw.max_file_size_mb > raw.max_total_upload_mb {
            return Err(Error::Config(
                "MAX_FILE_SIZE_MB cannot exceed MAX_TOTAL_UPLOAD_MB".to_string(),
            ));
        }

        let signature_algorithm: SignatureAlgorithm = raw.cloudinary_signature_algorithm.parse()?;

        let airtable = match (
            present(raw.airtable_personal_access_token),
            present(raw.airtable_base_id),
        ) {
            (Some(access_token), Some(base_id)) => Some(AirtableConfig {
                api_url: trim_slash(raw.airtable_api_url),
                access_token,
                base_id,
                bounties_table: raw.airtable_bounties_table_id,
                submissions_table: raw.airtable_submissions_table_id,
            }),
            _ => {
                warn!("Airtable credentials missing, bounty data will come from fallback samples");
                None
            }
        };

        let cloudinary = match (
            present(raw.cloudinary_cloud_name),
            present(raw.cloudinary_api_key),
            present(raw.cloudinary_api_secret),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                api_url: trim_slash(raw.cloudinary_api_url),
                cloud_name,
                api_key,
                api_secret,
                upload_folder: raw.cloudinary_upload_folder,
                signature_algorithm,
            }),
            _ => {
                warn!("Cloudinary credentials missing, attachments are disabled");
                None
            }
        };

        let privy = match (present(raw.privy_app_id), present(raw.privy_app_secret)) {
            (Some(app_id), Some(app_secret)) => Some(PrivyConfig {
                api_url: trim_slash(raw.privy_api_url),
                app_id,
                app_secret,
            }),
            _ => {
                warn!("Privy credentials missing, profile endpoints are disabled");
                None
            }
        };

        let origins = raw.cors_allowed_origins.trim();
        let cors_allowed_origins = if origins.is_empty() || origins == "*" {
            None
        } else {
            Some(
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            )
        };

        Ok(Self {
            server: ServerConfig {
                host: raw.host,
                port: raw.port,
                cors_allowed_origins,
            },
            airtable,
            cloudinary,
            privy,
            admin_api_key: present(raw.admin_api_key),
            webhook_secret: present(raw.webhook_secret),
            upload_limits: UploadLimits {
                max_file_bytes: raw.max_file_size_mb * MB,
                max_total_bytes: raw.max_total_upload_mb * MB,
                ..UploadLimits::default()
            },
            http_timeout: Duration::from_secs(raw.http_timeout_secs.max(1)),
        })
    }

    /// Which known environment variables are set. Values are never exposed.
    pub fn env_report() -> Vec<(&'static str, bool)> {
        KNOWN_ENV_VARS
            .iter()
            .map(|name| {
                let set = std::env::var(name)
                    .map(|v| !v.trim().is_empty())
                    .unwrap_or(false);
                (*name, set)
            })
            .collect()
    }
}

fn defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    let set = |b: config::ConfigBuilder<config::builder::DefaultState>, key: &str, value: &str| {
        b.set_default(key, value)
            .map_err(|e| Error::Config(e.to_string()))
    };

    let builder = set(builder, "host", "0.0.0.0")?;
    let builder = set(builder, "port", "3001")?;
    let builder = set(builder, "http_timeout_secs", "30")?;
    let builder = set(builder, "max_file_size_mb", "30")?;
    let builder = set(builder, "max_total_upload_mb", "50")?;
    let builder = set(builder, "cors_allowed_origins", "*")?;
    let builder = set(builder, "airtable_api_url", "https://api.airtable.com/v0")?;
    let builder = set(builder, "airtable_bounties_table_id", "Bounties")?;
    let builder = set(builder, "airtable_submissions_table_id", "Submissions")?;
    let builder = set(builder, "cloudinary_api_url", "https://api.cloudinary.com/v1_1")?;
    let builder = set(builder, "cloudinary_upload_folder", "bounty-submissions")?;
    let builder = set(builder, "cloudinary_signature_algorithm", "sha1")?;
    set(builder, "privy_api_url", "https://auth.privy.io/api/v1")
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
