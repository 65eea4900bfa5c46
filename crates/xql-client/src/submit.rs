use tracing::{info, warn};

use crate::client::XqlClient;
use crate::endpoints::Endpoint;
use crate::error::XqlError;
use crate::http::Transport;
use crate::types::{QueryId, QueryRequest};
use crate::wire::{self, RelativeTimeframe, StartQueryRequest};

impl<T: Transport> XqlClient<T> {
    /// Starts a query and hands its id to the caller. Only HTTP 200 counts as
    /// success and nothing is retried.
    pub fn submit(&self, request: &QueryRequest) -> Result<QueryId, XqlError> {
        let body = wire::encode(StartQueryRequest {
            query: &request.query,
            timeframe: RelativeTimeframe {
                relative_time: request.relative_time_ms,
            },
        })?;

        let response = self.transport().post_json(Endpoint::StartQuery, &body)?;
        if !response.is_ok() {
            warn!(status = response.status, "xql query submission rejected");
            return Err(XqlError::SubmitFailed {
                status: response.status,
                body: response.text_lossy(),
            });
        }

        let reply: String = wire::decode_reply(Endpoint::StartQuery, &response.body)?;
        if reply.trim().is_empty() {
            return Err(XqlError::MalformedResponse {
                stage: Endpoint::StartQuery.name(),
                body: response.text_lossy(),
            });
        }

        info!(query_id = %reply, "xql query submitted");
        Ok(QueryId::new(reply))
    }
}
