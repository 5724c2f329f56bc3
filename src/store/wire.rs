//! Wire Format Types
//!
//! Serde mirrors of the store's `/query` JSON response:
//!
//! ```json
//! {"results": [{"statement_id": 0,
//!               "series": [{"name": "cpu",
//!                           "tags": {"host": "a"},
//!                           "columns": ["time", "value"],
//!                           "values": [["2024-01-01T00:00:00Z", 1]]}]}]}
//! ```
//!
//! A failed query carries a top-level `error`, a failed statement carries its
//! own `error` inside the result group.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Full response of one query submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// One result group per statement. Absent when the store returned none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<StatementResult>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result group of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<Series>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Column-major rows of one series (measurement + tag set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<Value>>>,
}

impl QueryResult {
    /// A response holding the given result groups and no error.
    pub fn with_results(results: Vec<StatementResult>) -> Self {
        QueryResult {
            results: Some(results),
            error: None,
        }
    }

    /// A response carrying only a store error.
    pub fn with_error(message: impl Into<String>) -> Self {
        QueryResult {
            results: None,
            error: Some(message.into()),
        }
    }

    /// First non-blank error the store reported, top-level before per-statement.
    /// The message is returned untrimmed.
    pub fn error_message(&self) -> Option<&str> {
        let top = self.error.as_deref().filter(|e| !e.trim().is_empty());
        top.or_else(|| {
            self.results
                .iter()
                .flatten()
                .filter_map(|r| r.error.as_deref())
                .find(|e| !e.trim().is_empty())
        })
    }
}

impl StatementResult {
    pub fn new(series: Vec<Series>) -> Self {
        StatementResult {
            statement_id: None,
            series: Some(series),
            error: None,
        }
    }
}

impl Series {
    pub fn new(columns: Vec<String>, values: Vec<Vec<Value>>) -> Self {
        Series {
            name: None,
            tags: None,
            columns,
            values: Some(values),
        }
    }

    pub fn row_count(&self) -> usize {
        self.values.as_ref().map_or(0, Vec::len)
    }
}
