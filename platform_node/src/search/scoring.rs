//! Fixed-weight relevance scoring.

use super::{ContentType, SearchItem};

pub const EXACT_TITLE: u32 = 100;
pub const TITLE_PREFIX: u32 = 80;
pub const TITLE_CONTAINS: u32 = 60;
pub const WORD_EXACT: u32 = 40;
pub const WORD_PREFIX: u32 = 30;
pub const WORD_CONTAINS: u32 = 20;
pub const OTHER_FIELD: u32 = 10;
pub const BOUNTY_BONUS: u32 = 5;

/// Lowercase alphanumeric tokens, deduplicated, in query order.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if !tokens.contains(&word) {
            tokens.push(word);
        }
    }
    tokens
}

/// Lowercased query with runs of whitespace collapsed.
pub fn normalize_phrase(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Score an item against a normalized phrase and its tokens.
///
/// Only the strongest whole-title rule counts, and each token contributes
/// only its strongest rule, so an exact title match can never be outscored
/// by a partial one.
pub fn score(item: &SearchItem, phrase: &str, tokens: &[String]) -> u32 {
    let title = normalize_phrase(&item.title);
    let title_words = tokenize(&item.title);

    let mut total = if phrase.is_empty() {
        0
    } else if title == phrase {
        EXACT_TITLE
    } else if title.starts_with(phrase) {
        TITLE_PREFIX
    } else if title.contains(phrase) {
        TITLE_CONTAINS
    } else {
        0
    };

    let other_fields = item.secondary_text().to_lowercase();

    for token in tokens {
        let best = title_words
            .iter()
            .map(|word| {
                if word == token {
                    WORD_EXACT
                } else if word.starts_with(token.as_str()) {
                    WORD_PREFIX
                } else if word.contains(token.as_str()) {
                    WORD_CONTAINS
                } else {
                    0
                }
            })
            .max()
            .unwrap_or(0);

        total += if best > 0 {
            best
        } else if other_fields.contains(token.as_str()) {
            OTHER_FIELD
        } else {
            0
        };
    }

    if item.content_type == ContentType::Bounty {
        total += BOUNTY_BONUS;
    }

    total
}
