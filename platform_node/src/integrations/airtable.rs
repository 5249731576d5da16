//! Airtable REST client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{check_response, BountyStore};
use crate::common::{Error, Result};
use crate::config::AirtableConfig;
use crate::records::fields::submission_columns as col;
use crate::records::{bounty_from_record, submission_from_record, AirtableRecord};
use crate::submission::MAX_ATTACHMENTS;
use crate::types::{Bounty, BountySubmission, SubmissionSummary};

const SERVICE: &str = "Airtable";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

pub struct AirtableClient {
    client: Client,
    config: AirtableConfig,
}

impl AirtableClient {
    pub fn new(config: AirtableConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_url,
            self.config.base_id,
            urlencoding::encode(table)
        )
    }

    /// List every row of `table`, following pagination. `max_records` stops
    /// early once that many rows were read.
    pub async fn list_records(
        &self,
        table: &str,
        formula: Option<&str>,
        max_records: Option<usize>,
    ) -> Result<Vec<AirtableRecord>> {
        let url = self.table_url(table);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let page_size = max_records
                .map(|max| max.saturating_sub(records.len()).min(PAGE_SIZE))
                .unwrap_or(PAGE_SIZE);

            let mut query: Vec<(&str, String)> = vec![("pageSize", page_size.to_string())];
            if let Some(formula) = formula {
                query.push(("filterByFormula", formula.to_string()));
            }
            if let Some(offset) = &offset {
                query.push(("offset", offset.clone()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.config.access_token)
                .query(&query)
                .send()
                .await?;
            let page: ListResponse = check_response(SERVICE, response).await?.json().await?;

            debug!("Fetched {} records from {}", page.records.len(), table);
            records.extend(page.records);

            let reached_max = max_records.is_some_and(|max| records.len() >= max);
            match page.offset {
                Some(next) if !reached_max => offset = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    pub async fn get_record(&self, table: &str, id: &str) -> Result<Option<AirtableRecord>> {
        let url = format!("{}/{}", self.table_url(table), urlencoding::encode(id));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let record = check_response(SERVICE, response).await?.json().await?;
        Ok(Some(record))
    }

    pub async fn create_record(
        &self,
        table: &str,
        fields: Map<String, Value>,
    ) -> Result<AirtableRecord> {
        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.config.access_token)
            .json(&json!({ "fields": fields, "typecast": true }))
            .send()
            .await?;

        Ok(check_response(SERVICE, response).await?.json().await?)
    }
}

#[async_trait]
impl BountyStore for AirtableClient {
    async fn list_bounties(&self) -> Result<Vec<Bounty>> {
        let records = self
            .list_records(&self.config.bounties_table, None, None)
            .await?;
        Ok(records.iter().map(bounty_from_record).collect())
    }

    async fn get_bounty(&self, id: &str) -> Result<Option<Bounty>> {
        let record = self.get_record(&self.config.bounties_table, id).await?;
        Ok(record.as_ref().map(bounty_from_record))
    }

    async fn submission_exists(&self, user_id: &str, bounty_id: &str) -> Result<bool> {
        let formula = format!(
            "AND({{{}}} = '{}', {{{}}} = '{}')",
            col::USER_ID,
            escape_formula_value(user_id),
            col::BOUNTY_ID,
            escape_formula_value(bounty_id)
        );

        let records = self
            .list_records(&self.config.submissions_table, Some(&formula), Some(1))
            .await?;
        Ok(!records.is_empty())
    }

    async fn create_submission(&self, submission: &BountySubmission) -> Result<String> {
        let record = self
            .create_record(&self.config.submissions_table, submission_fields(submission))
            .await?;
        info!(
            "Created submission {} for bounty {}",
            record.id, submission.bounty_id
        );
        Ok(record.id)
    }

    async fn submissions_for_user(&self, user_id: &str) -> Result<Vec<SubmissionSummary>> {
        let formula = format!("{{{}}} = '{}'", col::USER_ID, escape_formula_value(user_id));
        let records = self
            .list_records(&self.config.submissions_table, Some(&formula), None)
            .await?;
        Ok(records.iter().map(submission_from_record).collect())
    }

    async fn probe(&self) -> Result<Vec<String>> {
        let records = self
            .list_records(&self.config.bounties_table, None, Some(1))
            .await?;
        let record = records.first().ok_or_else(|| Error::NotFound {
            kind: "record",
            id: self.config.bounties_table.clone(),
        })?;

        let mut names: Vec<String> = record.fields.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Row written to the submissions table. At most [`MAX_ATTACHMENTS`] files
/// are attached.
pub fn submission_fields(submission: &BountySubmission) -> Map<String, Value> {
    let attachments: Vec<Value> = submission
        .attachments
        .iter()
        .take(MAX_ATTACHMENTS)
        .map(|a| json!({ "url": a.url, "filename": a.file_name }))
        .collect();

    let mut fields = Map::new();
    fields.insert(col::NAME.into(), json!(submission.name));
    fields.insert(col::UNIVERSITY.into(), json!(submission.university));
    fields.insert(col::BOUNTY_ID.into(), json!(submission.bounty_id));
    fields.insert(col::SUBMISSION_LINK.into(), json!(submission.submission_link));
    fields.insert(col::WALLET_ADDRESS.into(), json!(submission.wallet_address));
    fields.insert(col::USER_ID.into(), json!(submission.user_id));
    fields.insert(col::SUBMITTED_AT.into(), json!(Utc::now().to_rfc3339()));
    if !attachments.is_empty() {
        fields.insert(col::ATTACHMENTS.into(), Value::Array(attachments));
    }
    fields
}

/// Quote a value for use inside a single-quoted `filterByFormula` string.
pub fn escape_formula_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attachment;

    fn submission(attachments: usize) -> BountySubmission {
        BountySubmission {
            user_id: "did:privy:abc".into(),
            name: "Ada".into(),
            university: "MIT".into(),
            bounty_id: "rec1".into(),
            submission_link: "https://github.com/ada/work".into(),
            wallet_address: "0x52908400098527886E0F7030069857D2E4169EE7".into(),
            attachments: (0..attachments)
                .map(|i| Attachment {
                    file_name: format!("file{i}.png"),
                    url: format!("https://res.cloudinary.com/demo/file{i}.png"),
                    public_id: format!("file{i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn formula_values_are_escaped() {
        assert_eq!(escape_formula_value("o'brien"), "o\\'brien");
        assert_eq!(escape_formula_value(r"a\b"), r"a\\b");
    }

    #[test]
    fn submission_row_caps_attachments() {
        let fields = submission_fields(&submission(5));

        assert_eq!(fields[col::ATTACHMENTS].as_array().unwrap().len(), MAX_ATTACHMENTS);
        assert_eq!(fields[col::USER_ID], json!("did:privy:abc"));
        assert_eq!(fields[col::BOUNTY_ID], json!("rec1"));
    }

    #[test]
    fn submission_row_omits_empty_attachments() {
        let fields = submission_fields(&submission(0));
        assert!(!fields.contains_key(col::ATTACHMENTS));
    }

    #[test]
    fn table_names_are_url_encoded() {
        let client = AirtableClient::new(
            AirtableConfig {
                api_url: "https://api.airtable.com/v0".into(),
                access_token: "pat".into(),
                base_id: "app1".into(),
                bounties_table: "Bounty List".into(),
                submissions_table: "Submissions".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            client.table_url("Bounty List"),
            "https://api.airtable.com/v0/app1/Bounty%20List"
        );
    }
}
