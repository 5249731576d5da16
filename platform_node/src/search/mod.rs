//! Free-text search over bounties and community records.
//!
//! Matching is a union of three cheap heuristics per query token: substring
//! containment in any searchable field, a word-boundary regex, and a
//! prefix/contains test against individual words. Ranking uses the fixed
//! weights in [`scoring`].

pub mod analytics;
pub mod scoring;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::Error;
use crate::types::{Activity, Bounty, BountyStatus, Winner};

pub use analytics::SearchAnalytics;
use scoring::{normalize_phrase, score, tokenize};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

/// Kinds of searchable content, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Bounty,
    Winner,
    Activity,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentType::Bounty => "bounty",
            ContentType::Winner => "winner",
            ContentType::Activity => "activity",
        })
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bounty" | "bounties" => Ok(ContentType::Bounty),
            "winner" | "winners" => Ok(ContentType::Winner),
            "activity" | "activities" => Ok(ContentType::Activity),
            other => Err(Error::validation(
                "type",
                format!("unknown content type '{other}'"),
            )),
        }
    }
}

/// Flattened view of anything that can be searched.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchItem {
    pub id: String,
    pub content_type: ContentType,
    pub title: String,
    pub description: String,
    pub category: String,
    pub skills: Vec<String>,
    pub tags: Vec<String>,
    pub status: Option<BountyStatus>,
}

impl SearchItem {
    fn fields(&self) -> impl Iterator<Item = &str> {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.category.as_str(),
        ]
        .into_iter()
        .chain(self.skills.iter().map(String::as_str))
        .chain(self.tags.iter().map(String::as_str))
    }

    /// Everything but the title, space separated.
    pub(crate) fn secondary_text(&self) -> String {
        self.fields().skip(1).collect::<Vec<_>>().join(" ")
    }
}

impl From<&Bounty> for SearchItem {
    fn from(bounty: &Bounty) -> Self {
        Self {
            id: bounty.id.clone(),
            content_type: ContentType::Bounty,
            title: bounty.title.clone(),
            description: bounty.description.clone(),
            category: bounty.category.clone(),
            skills: bounty.skills.clone(),
            tags: bounty.tags.clone(),
            status: Some(bounty.status),
        }
    }
}

impl From<&Winner> for SearchItem {
    fn from(winner: &Winner) -> Self {
        Self {
            id: winner.id.clone(),
            content_type: ContentType::Winner,
            title: winner.name.clone(),
            description: winner.bounty_title.clone(),
            category: winner.university.clone(),
            skills: vec![],
            tags: vec![],
            status: None,
        }
    }
}

impl From<&Activity> for SearchItem {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            content_type: ContentType::Activity,
            title: activity.description.clone(),
            description: activity.actor.clone(),
            category: String::new(),
            skills: vec![],
            tags: vec![],
            status: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: String,
    pub content_type: Option<ContentType>,
    pub status: Option<BountyStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub content_type: ContentType,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BountyStatus>,
    pub score: u32,
}

/// Filter, score and rank `items` for `query`.
pub fn search(items: &[SearchItem], query: &SearchQuery) -> Vec<SearchHit> {
    let phrase = normalize_phrase(&query.text);
    let tokens = tokenize(&query.text);
    if tokens.is_empty() {
        return Vec::new();
    }

    let matchers = TokenMatcher::build(&tokens);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let mut hits: Vec<SearchHit> = items
        .iter()
        .filter(|item| query.content_type.map_or(true, |t| item.content_type == t))
        .filter(|item| query.status.map_or(true, |s| item.status == Some(s)))
        .filter(|item| matchers.iter().any(|m| m.matches(item)))
        .map(|item| SearchHit {
            id: item.id.clone(),
            content_type: item.content_type,
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            status: item.status,
            score: score(item, &phrase, &tokens),
        })
        .collect();

    hits.sort_by(rank);
    hits.truncate(limit);
    hits
}

fn rank(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.content_type.cmp(&b.content_type))
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
}

struct TokenMatcher<'a> {
    token: &'a str,
    boundary: Option<Regex>,
}

impl<'a> TokenMatcher<'a> {
    fn build(tokens: &'a [String]) -> Vec<Self> {
        tokens
            .iter()
            .map(|token| TokenMatcher {
                token,
                boundary: Regex::new(&format!(r"(?i)\b{}", regex::escape(token))).ok(),
            })
            .collect()
    }

    fn matches(&self, item: &SearchItem) -> bool {
        item.fields().any(|field| {
            let lower = field.to_lowercase();
            lower.contains(self.token)
                || self
                    .boundary
                    .as_ref()
                    .is_some_and(|re| re.is_match(field))
                || tokenize(field)
                    .iter()
                    .any(|word| word.starts_with(self.token) || word.contains(self.token))
        })
    }
}
