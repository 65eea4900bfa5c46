use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use sha2::{Digest, Sha256};

use super::errors::HttpError;

pub const AUTH_ID_HEADER: &str = "x-xdr-auth-id";
pub const NONCE_HEADER: &str = "x-xdr-nonce";
pub const TIMESTAMP_HEADER: &str = "x-xdr-timestamp";

const NONCE_LEN: usize = 64;

/// How the API key is presented to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyKind {
    /// The key is sent as-is in the `Authorization` header.
    #[default]
    Standard,
    /// The key is hashed together with a per-request nonce and timestamp.
    Advanced,
}

impl KeyKind {
    pub fn from_name(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "standard" | "std" => Some(Self::Standard),
            "advanced" | "adv" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Advanced => "advanced",
        }
    }
}

/// Caller-supplied API credentials. Read-only once built.
#[derive(Clone)]
pub struct Credentials {
    auth_id: String,
    api_key: String,
    kind: KeyKind,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_id", &self.auth_id)
            .field("api_key", &"<redacted>")
            .field("kind", &self.kind)
            .finish()
    }
}

impl Credentials {
    pub fn new(auth_id: impl Into<String>, api_key: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            auth_id: auth_id.into(),
            api_key: api_key.into(),
            kind,
        }
    }

    pub fn auth_id(&self) -> &str {
        &self.auth_id
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Builds the auth headers for a single request. Advanced keys get a fresh
    /// nonce and timestamp every call.
    pub fn headers(&self) -> Result<HeaderMap, HttpError> {
        match self.kind {
            KeyKind::Standard => self.headers_with(None),
            KeyKind::Advanced => {
                let nonce = random_nonce(NONCE_LEN);
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis();
                self.headers_with(Some((&nonce, timestamp)))
            }
        }
    }

    fn headers_with(&self, advanced: Option<(&str, u128)>) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_ID_HEADER, header_value(AUTH_ID_HEADER, &self.auth_id)?);

        let authorization = match advanced {
            None => self.api_key.clone(),
            Some((nonce, timestamp)) => {
                let timestamp = timestamp.to_string();
                headers.insert(NONCE_HEADER, header_value(NONCE_HEADER, nonce)?);
                headers.insert(TIMESTAMP_HEADER, header_value(TIMESTAMP_HEADER, &timestamp)?);
                advanced_signature(&self.api_key, nonce, &timestamp)
            }
        };

        let mut value = header_value("authorization", &authorization)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(value).map_err(|_| HttpError::Header { name })
}

fn random_nonce(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn advanced_signature(api_key: &str, nonce: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.update(timestamp.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_key_is_sent_verbatim() {
        let credentials = Credentials::new("17", "secret-key", KeyKind::Standard);
        let headers = credentials.headers().expect("headers");

        assert_eq!(headers.get(AUTH_ID_HEADER).unwrap(), "17");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "secret-key");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
        assert!(headers.get(NONCE_HEADER).is_none());
        assert!(headers.get(TIMESTAMP_HEADER).is_none());
    }

    #[test]
    fn advanced_key_is_hashed_with_nonce_and_timestamp() {
        let credentials = Credentials::new("3", "abc", KeyKind::Advanced);
        let headers = credentials
            .headers_with(Some(("nonce", 1_700_000_000_000)))
            .expect("headers");

        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"abcnonce1700000000000");
            hex::encode(hasher.finalize())
        };
        assert_eq!(headers.get(NONCE_HEADER).unwrap(), "nonce");
        assert_eq!(headers.get(TIMESTAMP_HEADER).unwrap(), "1700000000000");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), expected.as_str());
    }

    #[test]
    fn advanced_headers_use_a_fresh_nonce_per_call() {
        let credentials = Credentials::new("3", "abc", KeyKind::Advanced);
        let first = credentials.headers().expect("first");
        let second = credentials.headers().expect("second");

        let nonce = first.get(NONCE_HEADER).unwrap().to_str().unwrap();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first.get(NONCE_HEADER), second.get(NONCE_HEADER));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let credentials = Credentials::new("3", "super-secret", KeyKind::Standard);
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn key_kind_names_are_case_insensitive() {
        assert_eq!(KeyKind::from_name("Advanced"), Some(KeyKind::Advanced));
        assert_eq!(KeyKind::from_name(" standard "), Some(KeyKind::Standard));
        assert_eq!(KeyKind::from_name("oauth"), None);
    }

    #[test]
    fn header_values_with_newlines_are_rejected() {
        let credentials = Credentials::new("1\n2", "key", KeyKind::Standard);
        assert!(matches!(
            credentials.headers(),
            Err(HttpError::Header { name: AUTH_ID_HEADER })
        ));
    }
}
