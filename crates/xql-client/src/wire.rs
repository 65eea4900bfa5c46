use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoints::Endpoint;
use crate::error::XqlError;
use crate::types::{QueryStats, QueryStatus};

pub const RESULT_FORMAT: &str = "json";

#[derive(Debug, Serialize)]
struct RequestEnvelope<T> {
    request_data: T,
}

#[derive(Debug, Serialize)]
pub struct StartQueryRequest<'a> {
    pub query: &'a str,
    pub timeframe: RelativeTimeframe,
}

#[derive(Debug, Serialize)]
pub struct RelativeTimeframe {
    #[serde(rename = "relativeTime")]
    pub relative_time: u64,
}

#[derive(Debug, Serialize)]
pub struct GetQueryResultsRequest<'a> {
    pub query_id: &'a str,
    pub pending_flag: bool,
    pub limit: u32,
    pub format: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GetStreamRequest<'a> {
    pub stream_id: &'a str,
    pub is_gzip_compressed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplyEnvelope<T> {
    pub reply: T,
}

#[derive(Debug, Deserialize)]
pub struct QueryResultsReply {
    pub status: QueryStatus,
    #[serde(default)]
    pub number_of_results: Option<u64>,
    #[serde(default)]
    pub query_cost: Option<Value>,
    #[serde(default)]
    pub remaining_quota: Option<f64>,
    #[serde(default)]
    pub results: Option<ResultsEnvelope>,
}

impl QueryResultsReply {
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            number_of_results: self.number_of_results,
            query_cost: self.query_cost.clone(),
            remaining_quota: self.remaining_quota,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResultsEnvelope {
    #[serde(default)]
    pub data: Option<Vec<Value>>,
    #[serde(default)]
    pub stream_id: Option<String>,
}

/// Wraps a request in the `{"request_data": ...}` envelope every endpoint expects.
pub fn encode<T: Serialize>(request_data: T) -> Result<Value, XqlError> {
    Ok(serde_json::to_value(RequestEnvelope { request_data })?)
}

pub fn decode_reply<T: DeserializeOwned>(endpoint: Endpoint, body: &[u8]) -> Result<T, XqlError> {
    serde_json::from_slice::<ReplyEnvelope<T>>(body)
        .map(|envelope| envelope.reply)
        .map_err(|_| XqlError::MalformedResponse {
            stage: endpoint.name(),
            body: String::from_utf8_lossy(body).to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_request_matches_wire_shape() {
        let body = encode(StartQueryRequest {
            query: "dataset = xdr_data | limit 5",
            timeframe: RelativeTimeframe {
                relative_time: 3_600_000,
            },
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "request_data": {
                    "query": "dataset = xdr_data | limit 5",
                    "timeframe": { "relativeTime": 3_600_000 }
                }
            })
        );
    }

    #[test]
    fn results_reply_tolerates_missing_optional_fields() {
        let reply: QueryResultsReply =
            decode_reply(Endpoint::GetQueryResults, br#"{"reply":{"status":"PENDING"}}"#)
                .unwrap();
        assert_eq!(reply.status, QueryStatus::Pending);
        assert!(reply.results.is_none());
        assert_eq!(reply.stats(), QueryStats::default());
    }

    #[test]
    fn unknown_status_is_malformed() {
        let err = decode_reply::<QueryResultsReply>(
            Endpoint::GetQueryResults,
            br#"{"reply":{"status":"EXPLODED"}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            XqlError::MalformedResponse { stage: "get_query_results", .. }
        ));
    }
}
