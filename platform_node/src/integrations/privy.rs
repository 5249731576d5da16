//! Privy user lookups and custom metadata updates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{check_response, IdentityProvider};
use crate::common::{Error, Result};
use crate::config::PrivyConfig;
use crate::types::Profile;

const SERVICE: &str = "Privy";

#[derive(Debug, Deserialize)]
struct LinkedAccount {
    #[serde(rename = "type")]
    kind: String,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrivyUser {
    id: String,
    #[serde(default)]
    linked_accounts: Vec<LinkedAccount>,
    #[serde(default)]
    custom_metadata: Map<String, Value>,
}

/// Only the wallet is carried over from the linked accounts.
impl From<PrivyUser> for Profile {
    fn from(user: PrivyUser) -> Self {
        let wallet_address = user
            .linked_accounts
            .into_iter()
            .find(|a| a.kind == "wallet")
            .and_then(|a| a.address);

        Profile {
            user_id: user.id,
            wallet_address,
            custom_metadata: user.custom_metadata,
        }
    }
}

pub struct PrivyClient {
    client: Client,
    config: PrivyConfig,
}

impl PrivyClient {
    pub fn new(config: PrivyConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.config.api_url, urlencoding::encode(user_id))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.config.app_id, Some(&self.config.app_secret))
            .header("privy-app-id", &self.config.app_id)
    }
}

#[async_trait]
impl IdentityProvider for PrivyClient {
    async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        let response = self
            .authorized(self.client.get(self.user_url(user_id)))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                kind: "user",
                id: user_id.to_string(),
            });
        }

        let user: PrivyUser = check_response(SERVICE, response).await?.json().await?;
        Ok(user.into())
    }

    async fn set_metadata(&self, user_id: &str, metadata: Map<String, Value>) -> Result<Profile> {
        let url = format!("{}/custom_metadata", self.user_url(user_id));
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({ "custom_metadata": metadata }))
            .send()
            .await?;

        let user: PrivyUser = check_response(SERVICE, response).await?.json().await?;
        info!("Updated custom metadata for {}", user.id);
        Ok(user.into())
    }
}
