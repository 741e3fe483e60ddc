//! Append-only search log entity, used for performance analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{SearchId, SearchType};

/// One logged vector search. A failed log write never fails the search
/// it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLog {
    /// Log entry identity
    pub search_id: SearchId,
    /// What kind of search ran
    pub search_type: SearchType,
    /// The query vector as searched
    pub query_vector: Vec<f32>,
    /// Search parameters (threshold, limit, filters) as JSON
    pub params: serde_json::Value,
    /// Rows the search returned
    pub result_count: i32,
    /// Wall-clock execution time
    pub execution_time_ms: f64,
    /// Scores of the returned rows, in rank order
    pub similarity_scores: Vec<f64>,
    /// Log time
    pub created_at: DateTime<Utc>,
}

impl SearchLog {
    /// Build a log row for a search that just ran.
    pub fn record(
        search_type: SearchType,
        query_vector: Vec<f32>,
        params: serde_json::Value,
        scores: &[f64],
        execution_time_ms: f64,
    ) -> Self {
        Self {
            search_id: SearchId::new(),
            search_type,
            query_vector,
            params,
            result_count: scores.len() as i32,
            execution_time_ms,
            similarity_scores: scores.to_vec(),
            created_at: Utc::now(),
        }
    }
}
