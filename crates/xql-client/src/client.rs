use tracing::info;

use crate::config::ClientConfig;
use crate::error::XqlError;
use crate::http::{ReqwestTransport, Transport};
use crate::poll::{CancelToken, PollPolicy};
use crate::stream::StreamOptions;
use crate::timeframe;
use crate::types::{QueryOutput, QueryRequest, Record, ResultPayload};

/// Runs XQL queries end to end: submit, wait for completion, fetch rows.
///
/// Each call works on its own query id. The client keeps no per-query state,
/// so the same instance can run any number of queries one after another.
pub struct XqlClient<T> {
    transport: T,
    poll_policy: PollPolicy,
    stream_options: StreamOptions,
    cancel: CancelToken,
}

impl XqlClient<ReqwestTransport> {
    pub fn connect(config: &ClientConfig) -> Result<Self, XqlError> {
        Ok(Self::new(ReqwestTransport::new(config)?))
    }
}

impl<T: Transport> XqlClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll_policy: PollPolicy::default(),
            stream_options: StreamOptions::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn with_stream_options(mut self, options: StreamOptions) -> Self {
        self.stream_options = options;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    pub fn stream_options(&self) -> StreamOptions {
        self.stream_options
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn run_query(
        &self,
        query: &str,
        relative_time: &str,
        limit: u32,
    ) -> Result<Vec<Record>, XqlError> {
        self.run_query_with_stats(query, relative_time, limit)
            .map(|output| output.records)
    }

    pub fn run_query_with_stats(
        &self,
        query: &str,
        relative_time: &str,
        limit: u32,
    ) -> Result<QueryOutput, XqlError> {
        let relative_time_ms = timeframe::parse(relative_time)?;
        let query_id = self.submit(&QueryRequest::new(query, relative_time_ms))?;
        let (payload, stats) = self.poll_with_stats(query_id, limit)?;
        let streamed = matches!(payload, ResultPayload::Stream(_));
        let records = self.resolve(payload)?;

        info!(records = records.len(), streamed, "xql query completed");
        Ok(QueryOutput { records, stats })
    }

    /// Flattens either payload shape into rows, following a stream handle if needed.
    pub fn resolve(&self, payload: ResultPayload) -> Result<Vec<Record>, XqlError> {
        match payload {
            ResultPayload::Inline(records) => Ok(records),
            ResultPayload::Stream(handle) => self.fetch_stream(&handle),
        }
    }
}
