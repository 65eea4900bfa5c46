pub mod auth;
pub mod client;
pub mod errors;

pub use auth::{Credentials, KeyKind};
pub use client::{HttpResponse, ReqwestTransport, Transport};
pub use errors::HttpError;
