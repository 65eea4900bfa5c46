use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::client::XqlClient;
use crate::endpoints::Endpoint;
use crate::error::XqlError;
use crate::http::{HttpResponse, Transport};
use crate::types::{QueryId, QueryStats, QueryStatus, ResultPayload, StreamHandle};
use crate::wire::{
    self, GetQueryResultsRequest, QueryResultsReply, ResultsEnvelope, RESULT_FORMAT,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_RESULT_LIMIT: u32 = 1000;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Cadence and bounds for the status loop. The default polls every two
/// seconds with no limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Shared flag that stops a poll loop between requests.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl<T: Transport> XqlClient<T> {
    /// Waits for a query to finish and returns its rows or its stream handle.
    pub fn poll(&self, query_id: QueryId, limit: u32) -> Result<ResultPayload, XqlError> {
        self.poll_with_stats(query_id, limit).map(|(payload, _)| payload)
    }

    pub fn poll_with_stats(
        &self,
        query_id: QueryId,
        limit: u32,
    ) -> Result<(ResultPayload, QueryStats), XqlError> {
        let policy = self.poll_policy();
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if self.cancel_token().is_cancelled() {
                return Err(XqlError::Cancelled {
                    query_id: query_id.to_string(),
                });
            }
            if let Some(timeout) = policy.timeout {
                if attempts > 0 && started.elapsed() >= timeout {
                    warn!(query_id = %query_id, attempts, "xql query timed out while pending");
                    return Err(XqlError::PollTimedOut {
                        query_id: query_id.to_string(),
                        attempts,
                        elapsed: started.elapsed(),
                    });
                }
            }

            attempts += 1;
            let response = self.request_results(&query_id, limit)?;
            let reply: QueryResultsReply =
                wire::decode_reply(Endpoint::GetQueryResults, &response.body)?;
            debug!(query_id = %query_id, attempt = attempts, status = ?reply.status, "xql poll");

            match reply.status {
                QueryStatus::Pending => {
                    if policy.max_attempts.is_some_and(|max| attempts >= max) {
                        warn!(query_id = %query_id, attempts, "xql query exhausted poll attempts");
                        return Err(XqlError::PollTimedOut {
                            query_id: query_id.to_string(),
                            attempts,
                            elapsed: started.elapsed(),
                        });
                    }
                    let mut wake_at = Instant::now() + policy.interval;
                    if let Some(timeout) = policy.timeout {
                        wake_at = wake_at.min(started + timeout);
                    }
                    self.sleep_unless_cancelled(&query_id, wake_at)?;
                }
                QueryStatus::Fail => {
                    warn!(query_id = %query_id, "xql query reported FAIL");
                    return Err(XqlError::QueryFailed {
                        query_id: query_id.to_string(),
                        body: response.text_lossy(),
                    });
                }
                QueryStatus::Success => {
                    let stats = reply.stats();
                    debug!(
                        query_id = %query_id,
                        number_of_results = ?stats.number_of_results,
                        remaining_quota = ?stats.remaining_quota,
                        "xql query succeeded"
                    );
                    let payload = payload_from(reply.results, &response)?;
                    return Ok((payload, stats));
                }
            }
        }
    }

    fn request_results(&self, query_id: &QueryId, limit: u32) -> Result<HttpResponse, XqlError> {
        // pending_flag = true asks the server to answer immediately while the
        // query is still running, so the cadence stays on this side.
        let body = wire::encode(GetQueryResultsRequest {
            query_id: query_id.as_str(),
            pending_flag: true,
            limit,
            format: RESULT_FORMAT,
        })?;

        let response = self.transport().post_json(Endpoint::GetQueryResults, &body)?;
        if !response.is_ok() {
            return Err(XqlError::PollRequestFailed {
                status: response.status,
                body: response.text_lossy(),
            });
        }
        Ok(response)
    }

    fn sleep_unless_cancelled(
        &self,
        query_id: &QueryId,
        deadline: Instant,
    ) -> Result<(), XqlError> {
        loop {
            if self.cancel_token().is_cancelled() {
                return Err(XqlError::Cancelled {
                    query_id: query_id.to_string(),
                });
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

fn payload_from(
    results: Option<ResultsEnvelope>,
    response: &HttpResponse,
) -> Result<ResultPayload, XqlError> {
    match results {
        Some(ResultsEnvelope {
            data: Some(records),
            ..
        }) => Ok(ResultPayload::Inline(records)),
        Some(ResultsEnvelope {
            stream_id: Some(stream_id),
            ..
        }) if !stream_id.trim().is_empty() => {
            Ok(ResultPayload::Stream(StreamHandle::new(stream_id)))
        }
        _ => Err(XqlError::MalformedResponse {
            stage: Endpoint::GetQueryResults.name(),
            body: response.text_lossy(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success_body(results: serde_json::Value) -> HttpResponse {
        HttpResponse::new(
            200,
            json!({ "reply": { "status": "SUCCESS", "results": results } }).to_string(),
        )
    }

    fn payload(results: serde_json::Value) -> Result<ResultPayload, XqlError> {
        let response = success_body(results);
        let reply: QueryResultsReply =
            wire::decode_reply(Endpoint::GetQueryResults, &response.body).unwrap();
        payload_from(reply.results, &response)
    }

    #[test]
    fn empty_inline_data_is_a_valid_result() {
        assert_eq!(payload(json!({ "data": [] })).unwrap(), ResultPayload::Inline(vec![]));
    }

    #[test]
    fn inline_data_wins_over_stream_id() {
        assert_eq!(
            payload(json!({ "data": [{ "a": 1 }], "stream_id": "S1" })).unwrap(),
            ResultPayload::Inline(vec![json!({ "a": 1 })])
        );
    }

    #[test]
    fn stream_id_becomes_a_handle() {
        assert_eq!(
            payload(json!({ "stream_id": "S1" })).unwrap(),
            ResultPayload::Stream(StreamHandle::new("S1"))
        );
    }

    #[test]
    fn envelope_without_data_or_stream_is_malformed() {
        for results in [json!({}), json!({ "stream_id": "" }), json!(null)] {
            assert!(matches!(
                payload(results),
                Err(XqlError::MalformedResponse { stage: "get_query_results", .. })
            ));
        }
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        assert_eq!(PollPolicy::default().with_max_attempts(0).max_attempts, Some(1));
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
