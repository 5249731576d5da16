use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::status::normalize_status;
use super::AirtableRecord;
use crate::types::{Bounty, SubmissionSummary};

/// Candidate column names for each bounty field, most common first.
pub mod bounty_columns {
    pub const TITLE: &[&str] = &["Title", "Tiltle", "Name"];
    pub const DESCRIPTION: &[&str] = &["Description", "Details"];
    pub const REQUIREMENTS: &[&str] = &["Requirements", "Requirement"];
    pub const REWARD: &[&str] = &["Reward", "Rewards", "Bounty Amount"];
    pub const DEADLINE: &[&str] = &["Deadline", "Due Date"];
    pub const CATEGORY: &[&str] = &["Category", "Categories"];
    pub const STATUS: &[&str] = &["Status", "Select"];
    pub const SKILLS: &[&str] = &["Skills"];
    pub const TAGS: &[&str] = &["Tags"];
}

/// Column names written to, and read from, the submissions table.
pub mod submission_columns {
    pub const NAME: &str = "Name";
    pub const UNIVERSITY: &str = "University";
    pub const BOUNTY_ID: &str = "Bounty ID";
    pub const SUBMISSION_LINK: &str = "Submission Link";
    pub const WALLET_ADDRESS: &str = "Wallet Address";
    pub const USER_ID: &str = "User ID";
    pub const ATTACHMENTS: &str = "Attachments";
    pub const SUBMITTED_AT: &str = "Submitted At";
}

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

/// Build a [`Bounty`] from a bounties-table row, tolerating renamed columns.
pub fn bounty_from_record(record: &AirtableRecord) -> Bounty {
    use bounty_columns::*;

    let fields = &record.fields;

    Bounty {
        id: record.id.clone(),
        title: pick(fields, TITLE).map(text).unwrap_or_default(),
        description: pick(fields, DESCRIPTION).map(text).unwrap_or_default(),
        requirements: pick(fields, REQUIREMENTS).map(text).unwrap_or_default(),
        reward: pick(fields, REWARD).map(reward).unwrap_or(0.0),
        deadline: pick(fields, DEADLINE)
            .map(|v| deadline(&text(v)))
            .unwrap_or_default(),
        category: pick(fields, CATEGORY).map(text).unwrap_or_default(),
        status: pick(fields, STATUS)
            .map(|v| normalize_status(&text(v)))
            .unwrap_or_default(),
        skills: pick(fields, SKILLS).map(list).unwrap_or_default(),
        tags: pick(fields, TAGS).map(list).unwrap_or_default(),
    }
}

/// Read a submissions-table row back into a summary.
pub fn submission_from_record(record: &AirtableRecord) -> SubmissionSummary {
    use submission_columns::*;

    let fields = &record.fields;
    let attachment_urls = match fields.get(ATTACHMENTS) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("url").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    SubmissionSummary {
        id: record.id.clone(),
        bounty_id: fields.get(BOUNTY_ID).map(text).unwrap_or_default(),
        submission_link: fields.get(SUBMISSION_LINK).map(text).unwrap_or_default(),
        submitted_at: fields
            .get(SUBMITTED_AT)
            .map(text)
            .or_else(|| record.created_time.clone()),
        attachment_urls,
    }
}

/// First candidate column that holds a non-empty value.
pub fn pick<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Flatten a cell into display text. Lists (multi-selects, linked records)
/// are joined with `", "`; single-select objects use their `name`.
pub fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(obj) => obj
            .get("name")
            .or_else(|| obj.get("value"))
            .map(text)
            .unwrap_or_default(),
    }
}

fn list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(text)
            .filter(|s| !s.is_empty())
            .collect(),
        other => text(other)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

/// Numeric reward. Strings such as `"$1,500"` or `"500 USDC"` use their
/// first numeric run.
fn reward(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        other => {
            let cleaned = text(other).replace(',', "");
            NUMBER
                .find(&cleaned)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0.0)
        }
    }
}

/// `YYYY-MM-DD` when the input is a date or timestamp, otherwise verbatim.
fn deadline(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return date.format("%Y-%m-%d").to_string();
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BountyStatus;
    use serde_json::json;

    fn record(fields: Value) -> AirtableRecord {
        AirtableRecord {
            id: "recABC".into(),
            fields: fields.as_object().cloned().unwrap_or_default(),
            created_time: Some("2024-03-01T10:00:00.000Z".into()),
        }
    }

    #[test]
    fn reads_canonical_columns() {
        let bounty = bounty_from_record(&record(json!({
            "Title": "Build a dashboard",
            "Description": "Charts for campus events",
            "Requirements": "React",
            "Reward": 250,
            "Deadline": "2024-06-30",
            "Category": "Development",
            "Status": "In Progress",
            "Skills": ["TypeScript", "D3"],
            "Tags": "frontend, data"
        })));

        assert_eq!(bounty.id, "recABC");
        assert_eq!(bounty.title, "Build a dashboard");
        assert_eq!(bounty.reward, 250.0);
        assert_eq!(bounty.deadline, "2024-06-30");
        assert_eq!(bounty.status, BountyStatus::InProgress);
        assert_eq!(bounty.skills, vec!["TypeScript", "D3"]);
        assert_eq!(bounty.tags, vec!["frontend", "data"]);
    }

    #[test]
    fn falls_back_to_misspelled_columns() {
        let bounty = bounty_from_record(&record(json!({
            "Tiltle": "Write a thread",
            "Rewards": "$1,500 USDC",
            "Select": "Done",
            "Categories": ["Content", "Marketing"],
            "Due Date": "2024-07-01T12:00:00.000Z"
        })));

        assert_eq!(bounty.title, "Write a thread");
        assert_eq!(bounty.reward, 1500.0);
        assert_eq!(bounty.status, BountyStatus::Closed);
        assert_eq!(bounty.category, "Content, Marketing");
        assert_eq!(bounty.deadline, "2024-07-01");
    }

    #[test]
    fn blank_primary_column_uses_next_candidate() {
        let bounty = bounty_from_record(&record(json!({
            "Title": "  ",
            "Tiltle": "Fallback title",
            "Status": null,
            "Select": {"name": "closed"}
        })));

        assert_eq!(bounty.title, "Fallback title");
        assert_eq!(bounty.status, BountyStatus::Closed);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let bounty = bounty_from_record(&record(json!({})));

        assert_eq!(bounty.title, "");
        assert_eq!(bounty.reward, 0.0);
        assert_eq!(bounty.status, BountyStatus::Open);
        assert!(bounty.skills.is_empty());
    }

    #[test]
    fn unparseable_deadline_is_kept() {
        assert_eq!(deadline("end of semester"), "end of semester");
        assert_eq!(deadline("12/31/2024"), "2024-12-31");
    }

    #[test]
    fn submission_summary_reads_attachments() {
        let summary = submission_from_record(&record(json!({
            "Bounty ID": "rec1",
            "Submission Link": "https://github.com/me/repo",
            "Attachments": [{"url": "https://res.cloudinary.com/a.png", "filename": "a.png"}]
        })));

        assert_eq!(summary.bounty_id, "rec1");
        assert_eq!(summary.attachment_urls, vec!["https://res.cloudinary.com/a.png"]);
        assert_eq!(summary.submitted_at.as_deref(), Some("2024-03-01T10:00:00.000Z"));
    }
}
