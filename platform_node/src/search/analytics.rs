use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MAX_EVENTS: usize = 1000;
const TOP_QUERIES: usize = 10;
const RECENT_MISSES: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEvent {
    pub query: String,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCount {
    pub query: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    /// Searches since start up, including those evicted from the window.
    pub total_searches: u64,
    pub tracked_events: usize,
    pub top_queries: Vec<QueryCount>,
    pub zero_result_queries: Vec<SearchEvent>,
}

/// Bounded in-memory log of recent searches. Lost on restart.
#[derive(Debug)]
pub struct SearchAnalytics {
    events: VecDeque<SearchEvent>,
    capacity: usize,
    total: u64,
}

impl Default for SearchAnalytics {
    fn default() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }
}

impl SearchAnalytics {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(MAX_EVENTS)),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn record(&mut self, query: &str, result_count: usize) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(SearchEvent {
            query: query.trim().to_lowercase(),
            result_count,
            timestamp: Utc::now(),
        });
        self.total += 1;
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for event in &self.events {
            *counts.entry(event.query.as_str()).or_default() += 1;
        }

        let mut top_queries: Vec<QueryCount> = counts
            .into_iter()
            .map(|(query, count)| QueryCount {
                query: query.to_string(),
                count,
            })
            .collect();
        top_queries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        top_queries.truncate(TOP_QUERIES);

        let zero_result_queries = self
            .events
            .iter()
            .rev()
            .filter(|e| e.result_count == 0)
            .take(RECENT_MISSES)
            .cloned()
            .collect();

        AnalyticsSummary {
            total_searches: self.total,
            tracked_events: self.events.len(),
            top_queries,
            zero_result_queries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_queries_are_counted_case_insensitively() {
        let mut analytics = SearchAnalytics::default();
        analytics.record("Design", 3);
        analytics.record("design ", 3);
        analytics.record("rust", 1);

        let summary = analytics.summary();
        assert_eq!(summary.total_searches, 3);
        assert_eq!(
            summary.top_queries[0],
            QueryCount {
                query: "design".into(),
                count: 2
            }
        );
    }

    #[test]
    fn window_is_bounded_but_total_keeps_counting() {
        let mut analytics = SearchAnalytics::with_capacity(2);
        analytics.record("a", 1);
        analytics.record("b", 0);
        analytics.record("c", 0);

        let summary = analytics.summary();
        assert_eq!(summary.total_searches, 3);
        assert_eq!(summary.tracked_events, 2);
        let misses: Vec<_> = summary.zero_result_queries.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(misses, vec!["c", "b"]);
    }
}
