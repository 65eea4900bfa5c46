use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Unsupported URL scheme '{0}' (expected http or https)")]
    Scheme(String),
    #[error("Invalid value for header {name}")]
    Header { name: &'static str },
}
