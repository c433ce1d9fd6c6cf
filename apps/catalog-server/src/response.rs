use serde::Serialize;

use catalog_core::types::{RankedResultSet, SearchMode};
use catalog_hybrid::SearchOutcome;

/// `{query, mode, count, results}`; `count` is always `results.len()`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub count: usize,
    pub results: RankedResultSet,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self { count: outcome.results.len(), query: outcome.query, mode: outcome.mode, results: outcome.results }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub inserted: usize,
    pub total_sent: usize,
}
