use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::records::status::normalize_status;

/// Canonical bounty status.
///
/// Upstream labels are free text; [`normalize_status`] maps them onto one of
/// these three values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BountyStatus {
    #[default]
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "closed")]
    Closed,
}

impl BountyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BountyStatus::Open => "open",
            BountyStatus::InProgress => "in-progress",
            BountyStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BountyStatus {
    type Err = std::convert::Infallible;

    /// Never fails: unknown labels normalize to `open`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(normalize_status(s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounty {
    pub id: String,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub reward: f64,
    /// ISO date (`YYYY-MM-DD`) when the upstream value parses as one.
    pub deadline: String,
    /// Comma-separated category list.
    pub category: String,
    pub status: BountyStatus,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Bounty {
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.category
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Case-insensitive substring match against each listed category.
    pub fn in_category(&self, category: &str) -> bool {
        let wanted = category.trim().to_lowercase();
        self.categories().any(|c| c.to_lowercase().contains(&wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_canonical_label() {
        let json = serde_json::to_string(&BountyStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!("In Review".parse::<BountyStatus>().unwrap(), BountyStatus::InProgress);
    }

    #[test]
    fn category_matching_is_case_insensitive_substring() {
        let bounty = Bounty {
            id: "rec1".into(),
            title: "Design a logo".into(),
            description: String::new(),
            requirements: String::new(),
            reward: 100.0,
            deadline: "2025-01-31".into(),
            category: "Design, Marketing".into(),
            status: BountyStatus::Open,
            skills: vec![],
            tags: vec![],
        };

        assert!(bounty.in_category("marketing"));
        assert!(bounty.in_category(" DESIGN "));
        assert!(bounty.in_category("market"));
        assert!(!bounty.in_category("Development"));
    }
}
