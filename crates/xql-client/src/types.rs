use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// One decoded result row, inline or streamed.
pub type Record = Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    pub relative_time_ms: u64,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, relative_time_ms: u64) -> Self {
        Self {
            query: query.into(),
            relative_time_ms,
        }
    }
}

/// Opaque id returned by `start_xql_query`, echoed back on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamHandle(String);

impl StreamHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryStatus {
    Pending,
    Success,
    Fail,
}

impl QueryStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What a successful poll hands back: rows inline, or a stream to fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    Inline(Vec<Record>),
    Stream(StreamHandle),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    pub number_of_results: Option<u64>,
    pub query_cost: Option<Value>,
    pub remaining_quota: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub records: Vec<Record>,
    pub stats: QueryStats,
}
