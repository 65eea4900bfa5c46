use std::time::Duration;

use thiserror::Error;

use crate::http::HttpError;

#[derive(Debug, Error)]
pub enum XqlError {
    #[error("invalid time window '{0}': expected digits followed by d, h or m")]
    InvalidTimeFormat(String),
    #[error("unsupported time unit '{0}'")]
    UnsupportedTimeUnit(char),
    #[error("start_xql_query failed (HTTP {status}): {body}")]
    SubmitFailed { status: u16, body: String },
    #[error("query {query_id} failed: {body}")]
    QueryFailed { query_id: String, body: String },
    #[error("get_query_results failed (HTTP {status}): {body}")]
    PollRequestFailed { status: u16, body: String },
    #[error("malformed {stage} response: {body}")]
    MalformedResponse { stage: &'static str, body: String },
    #[error("get_query_results_stream failed (HTTP {status}): {body}")]
    StreamFetchFailed { status: u16, body: String },
    #[error("failed to decode stream record on line {line}: {message}")]
    StreamDecodeError { line: usize, message: String },
    #[error("query {query_id} still pending after {attempts} attempts ({elapsed:?})")]
    PollTimedOut {
        query_id: String,
        attempts: u32,
        elapsed: Duration,
    },
    #[error("polling for query {query_id} was cancelled")]
    Cancelled { query_id: String },
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl XqlError {
    /// The step of the submit, poll, fetch flow that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidTimeFormat(_) | Self::UnsupportedTimeUnit(_) => "timeframe",
            Self::SubmitFailed { .. } => "submit",
            Self::QueryFailed { .. }
            | Self::PollRequestFailed { .. }
            | Self::PollTimedOut { .. }
            | Self::Cancelled { .. } => "poll",
            Self::MalformedResponse { stage, .. } => *stage,
            Self::StreamFetchFailed { .. } | Self::StreamDecodeError { .. } => "stream",
            Self::Encode(_) | Self::Http(_) => "transport",
        }
    }
}
