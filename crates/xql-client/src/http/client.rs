use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::auth::Credentials;
use super::errors::HttpError;
use crate::config::ClientConfig;
use crate::endpoints::{api_root, Endpoint};

/// Status and raw body of a completed request. Non-2xx statuses are not
/// errors at this layer; each caller decides what a status means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

pub trait Transport: Send + Sync {
    fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<HttpResponse, HttpError>;
}

pub struct ReqwestTransport {
    client: Client,
    api_root: Url,
    credentials: Credentials,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, HttpError> {
        Ok(Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .build()?,
            api_root: api_root(&config.base_url)?,
            credentials: config.credentials.clone(),
        })
    }
}

impl Transport for ReqwestTransport {
    fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<HttpResponse, HttpError> {
        let url = endpoint.url(&self.api_root)?;
        let mut headers = self.credentials.headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .map_err(HttpError::Request)?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(HttpError::Request)?;
        debug!(
            endpoint = endpoint.name(),
            status,
            bytes = body.len(),
            "xql request completed"
        );

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
