use url::Url;

use crate::http::HttpError;

pub const API_PREFIX: &str = "public_api/v1/xql/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    StartQuery,
    GetQueryResults,
    GetQueryResultsStream,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartQuery => "start_xql_query",
            Self::GetQueryResults => "get_query_results",
            Self::GetQueryResultsStream => "get_query_results_stream",
        }
    }

    pub fn path(self) -> String {
        format!("{}/", self.name())
    }

    pub fn url(self, api_root: &Url) -> Result<Url, HttpError> {
        Ok(api_root.join(&self.path())?)
    }
}

pub fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

/// Resolves `{base}/public_api/v1/xql/` for a tenant base URL.
pub fn api_root(base_url: &str) -> Result<Url, HttpError> {
    let url = Url::parse(&format!("{}/{}", normalize_base_url(base_url), API_PREFIX))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HttpError::Scheme(other.to_string())),
    }
}
