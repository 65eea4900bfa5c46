use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Deserialize;
use xql_client::{
    ClientConfig, Credentials, DEFAULT_RESULT_LIMIT, KeyKind, PollPolicy, StreamOptions,
};

use crate::io;

const CONFIG_ENV: &str = "XQL_CONFIG";
const BASE_URL_ENV: &str = "XQL_BASE_URL";
const AUTH_ID_ENV: &str = "XQL_AUTH_ID";
const API_KEY_ENV: &str = "XQL_API_KEY";
const KEY_TYPE_ENV: &str = "XQL_KEY_TYPE";

#[derive(Args, Default)]
pub struct ConnectionArgs {
    /// Path to xql.toml (defaults to ~/.xql/xql.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Tenant API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// API key id sent as x-xdr-auth-id
    #[arg(long, global = true)]
    auth_id: Option<String>,
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// standard or advanced
    #[arg(long, global = true)]
    key_type: Option<String>,
    /// Seconds between status polls
    #[arg(long, global = true)]
    poll_interval: Option<u64>,
    /// Give up after this many PENDING replies
    #[arg(long, global = true)]
    max_attempts: Option<u32>,
    /// Give up after this many seconds of polling
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct XqlConfigFile {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub auth_id: Option<String>,
    pub api_key: Option<String>,
    pub key_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryConfig {
    pub limit: Option<u32>,
    pub poll_interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub gzip: Option<bool>,
}

pub struct Settings {
    pub client: ClientConfig,
    pub poll: PollPolicy,
    pub stream: StreamOptions,
    pub limit: u32,
}

impl Settings {
    pub fn limit_or_default(&self, limit_override: Option<u32>) -> u32 {
        limit_override.unwrap_or(self.limit)
    }
}

pub fn resolve_settings(args: &ConnectionArgs) -> Result<Settings> {
    let env = |key: &str| std::env::var(key).ok();
    let path = normalize_optional(args.config.as_ref().map(|path| path.display().to_string()))
        .map(PathBuf::from)
        .or_else(|| normalize_optional(env(CONFIG_ENV)).map(PathBuf::from))
        .or_else(default_config_path);
    let file = match path {
        Some(path) => load_config_file(&path)?,
        None => XqlConfigFile::default(),
    };
    resolve_settings_with(args, &file, env)
}

pub fn load_config_file(path: &Path) -> Result<XqlConfigFile> {
    if !path.exists() {
        return Ok(XqlConfigFile::default());
    }
    let text = io::read_to_string(path)?;
    parse_config(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<XqlConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Flag, then environment, then config file, then default.
pub fn resolve_settings_with(
    args: &ConnectionArgs,
    file: &XqlConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let base_url = normalize_optional(args.base_url.clone())
        .or_else(|| normalize_optional(env(BASE_URL_ENV)))
        .or_else(|| normalize_optional(file.api.base_url.clone()))
        .with_context(|| {
            format!("API base URL is required (pass --base-url or set {BASE_URL_ENV})")
        })?;
    let auth_id = normalize_optional(args.auth_id.clone())
        .or_else(|| normalize_optional(env(AUTH_ID_ENV)))
        .or_else(|| normalize_optional(file.api.auth_id.clone()))
        .with_context(|| format!("API key id is required (pass --auth-id or set {AUTH_ID_ENV})"))?;
    let api_key = normalize_optional(args.api_key.clone())
        .or_else(|| normalize_optional(env(API_KEY_ENV)))
        .or_else(|| normalize_optional(file.api.api_key.clone()))
        .with_context(|| format!("API key is required (pass --api-key or set {API_KEY_ENV})"))?;

    let key_kind = match normalize_optional(args.key_type.clone())
        .or_else(|| normalize_optional(env(KEY_TYPE_ENV)))
        .or_else(|| normalize_optional(file.api.key_type.clone()))
    {
        Some(name) => match KeyKind::from_name(&name) {
            Some(kind) => kind,
            None => bail!("Unknown key type '{name}' (expected standard or advanced)"),
        },
        None => KeyKind::default(),
    };

    let mut poll = PollPolicy::default();
    if let Some(secs) = args.poll_interval.or(file.query.poll_interval_secs) {
        poll = poll.with_interval(Duration::from_secs(secs));
    }
    if let Some(max_attempts) = args.max_attempts.or(file.query.max_attempts) {
        poll = poll.with_max_attempts(max_attempts);
    }
    if let Some(secs) = args.timeout.or(file.query.timeout_secs) {
        poll = poll.with_timeout(Duration::from_secs(secs));
    }

    Ok(Settings {
        client: ClientConfig::new(base_url, Credentials::new(auth_id, api_key, key_kind)),
        poll,
        stream: StreamOptions {
            gzip: file.query.gzip.unwrap_or(false),
        },
        limit: file.query.limit.unwrap_or(DEFAULT_RESULT_LIMIT),
    })
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".xql").join("xql.toml"))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_file() -> XqlConfigFile {
        parse_config(
            r#"
            [api]
            base_url = "https://file.example.com"
            auth_id = "7"
            api_key = "file-key"
            key_type = "advanced"

            [query]
            limit = 250
            poll_interval_secs = 5
            max_attempts = 12
            timeout_secs = 600
            gzip = true
            "#,
        )
        .expect("valid config")
    }

    #[test]
    fn config_file_supplies_everything() {
        let settings =
            resolve_settings_with(&ConnectionArgs::default(), &full_file(), env_from(&[]))
                .expect("settings");

        assert_eq!(settings.client.base_url, "https://file.example.com");
        assert_eq!(settings.client.credentials.auth_id(), "7");
        assert_eq!(settings.client.credentials.kind(), KeyKind::Advanced);
        assert_eq!(settings.limit, 250);
        assert!(settings.stream.gzip);
        assert_eq!(settings.poll.interval, Duration::from_secs(5));
        assert_eq!(settings.poll.max_attempts, Some(12));
        assert_eq!(settings.poll.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn flags_beat_env_and_env_beats_file() {
        let args = ConnectionArgs {
            base_url: Some("https://flag.example.com".to_string()),
            poll_interval: Some(1),
            ..ConnectionArgs::default()
        };
        let env = env_from(&[
            (BASE_URL_ENV, "https://env.example.com"),
            (AUTH_ID_ENV, "99"),
            (KEY_TYPE_ENV, "standard"),
        ]);

        let settings = resolve_settings_with(&args, &full_file(), env).expect("settings");

        assert_eq!(settings.client.base_url, "https://flag.example.com");
        assert_eq!(settings.client.credentials.auth_id(), "99");
        assert_eq!(settings.client.credentials.kind(), KeyKind::Standard);
        assert_eq!(settings.poll.interval, Duration::from_secs(1));
    }

    #[test]
    fn defaults_apply_without_query_section() {
        let env = env_from(&[
            (BASE_URL_ENV, "https://env.example.com"),
            (AUTH_ID_ENV, "1"),
            (API_KEY_ENV, "k"),
        ]);

        let settings =
            resolve_settings_with(&ConnectionArgs::default(), &XqlConfigFile::default(), env)
                .expect("settings");

        assert_eq!(settings.limit, DEFAULT_RESULT_LIMIT);
        assert_eq!(settings.poll, PollPolicy::default());
        assert!(!settings.stream.gzip);
        assert_eq!(settings.limit_or_default(Some(5)), 5);
    }

    #[test]
    fn missing_api_key_names_the_env_var() {
        let env = env_from(&[(BASE_URL_ENV, "https://env.example.com"), (AUTH_ID_ENV, "1")]);

        let err = resolve_settings_with(&ConnectionArgs::default(), &XqlConfigFile::default(), env)
            .err()
            .expect("missing key");

        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn blank_values_are_treated_as_missing() {
        let env = env_from(&[
            (BASE_URL_ENV, "   "),
            (AUTH_ID_ENV, "1"),
            (API_KEY_ENV, "k"),
        ]);

        let result =
            resolve_settings_with(&ConnectionArgs::default(), &XqlConfigFile::default(), env);

        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_type_is_rejected() {
        let env = env_from(&[
            (BASE_URL_ENV, "https://env.example.com"),
            (AUTH_ID_ENV, "1"),
            (API_KEY_ENV, "k"),
            (KEY_TYPE_ENV, "oauth"),
        ]);

        let result =
            resolve_settings_with(&ConnectionArgs::default(), &XqlConfigFile::default(), env);

        assert!(result.is_err());
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        assert!(parse_config("[api\nbase_url = ").is_err());
    }

    #[test]
    fn missing_config_file_is_empty() {
        let file = load_config_file(Path::new("/nonexistent/xql/xql.toml")).expect("empty");
        assert!(file.api.base_url.is_none());
    }
}
