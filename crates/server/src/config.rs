//! Serving configuration.

use serde::{Deserialize, Serialize};

/// Knobs of the recommendation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum similarity ratio for a fuzzy title match
    pub fuzzy_threshold: f64,
    /// Titles suggested when a query cannot be resolved
    pub suggestion_limit: usize,
    /// Result cap of the autocomplete search
    pub search_limit: usize,
    /// Shortest query the autocomplete search answers
    pub min_search_len: usize,
    /// MMR diversity weight used when a caller does not pick one
    pub default_diversity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            suggestion_limit: 5,
            search_limit: 20,
            min_search_len: 2,
            default_diversity: 0.3,
        }
    }
}
