//! Blocking client for the XQL query API: submit a query, poll until it
//! settles, then read rows inline or from the result stream.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod poll;
pub mod stream;
pub mod submit;
pub mod timeframe;
pub mod types;
pub mod wire;


pub use client::XqlClient;
pub use config::ClientConfig;
pub use endpoints::Endpoint;
pub use error::XqlError;
pub use http::{Credentials, HttpError, HttpResponse, KeyKind, ReqwestTransport, Transport};
pub use poll::{CancelToken, PollPolicy, DEFAULT_POLL_INTERVAL, DEFAULT_RESULT_LIMIT};
pub use stream::StreamOptions;
pub use types::{
    QueryId, QueryOutput, QueryRequest, QueryStats, QueryStatus, Record, ResultPayload,
    StreamHandle,
};
