//! Configuration for Vouch.
//!
//! Raw TOML (`~/.vouch/config.toml`) deserializes into [`VouchConfig`], whose
//! fields are all optional. [`VouchConfig::resolve`] applies environment
//! overrides and defaults and validates the result into a [`ResolvedConfig`].
//!
//! ```toml
//! [api]
//! base_url = "https://api.example.org"
//! session_token = "${VOUCH_TOKEN}"
//! timeout_secs = 30
//!
//! [retry]
//! max_retries = 2
//! initial_delay_ms = 250
//! max_delay_ms = 4000
//!
//! [cache]
//! stale_after_secs = 60
//! ```

use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use url::Url;

pub const API_URL_ENV: &str = "VOUCH_API_URL";
pub const SESSION_TOKEN_ENV: &str = "VOUCH_SESSION_TOKEN";

pub const DEFAULT_API_URL: &str = "http://localhost:8888";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_INITIAL_DELAY_MS: u64 = 250;
const DEFAULT_MAX_DELAY_MS: u64 = 4_000;
const DEFAULT_STALE_AFTER_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize)]
pub struct VouchConfig {
    pub api: Option<ApiSection>,
    pub retry: Option<RetrySection>,
    pub cache: Option<CacheSection>,
}

#[derive(Default, Deserialize)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub session_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

// Manual Debug impl to prevent leaking the session token in logs.
impl std::fmt::Debug for ApiSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSection")
            .field("base_url", &self.base_url)
            .field(
                "session_token",
                &if self.session_token.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheSection {
    /// Cached lookups older than this are refetched.
    pub stale_after_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid API base URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

/// Retry tuning, mirrored into the HTTP client's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

/// Fully validated configuration. Holding one means every value is usable.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub base_url: Url,
    pub session_token: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetrySettings,
    pub cache_stale_after: Duration,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .field("cache_stale_after", &self.cache_stale_after)
            .finish()
    }
}

/// Replace `${VAR}` references using `lookup`. Unknown variables expand to
/// nothing; an unterminated `${` is kept literally.
pub fn expand_env_vars_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty()
            && let Some(replacement) = lookup(var)
        {
            out.push_str(&replacement);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl VouchConfig {
    /// Load from the default location. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            tracing::debug!("No home directory; using default config");
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.resolve_with_env(|name| env::var(name).ok())
    }

    /// Environment overrides win over file values; file values win over defaults.
    pub fn resolve_with_env<F>(&self, lookup: F) -> Result<ResolvedConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api = self.api.as_ref();
        let non_blank = |value: String| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        let raw_url = lookup(API_URL_ENV)
            .and_then(non_blank)
            .or_else(|| {
                api.and_then(|a| a.base_url.as_deref())
                    .map(|v| expand_env_vars_with(v, &lookup))
                    .and_then(non_blank)
            })
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            value: raw_url.clone(),
            source,
        })?;

        let session_token = lookup(SESSION_TOKEN_ENV).and_then(non_blank).or_else(|| {
            api.and_then(|a| a.session_token.as_deref())
                .map(|v| expand_env_vars_with(v, &lookup))
                .and_then(non_blank)
        });

        let timeout_secs = api
            .and_then(|a| a.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout_secs",
                reason: "must be greater than zero",
            });
        }

        let retry = self.retry.as_ref();
        let initial_delay_ms = retry
            .and_then(|r| r.initial_delay_ms)
            .unwrap_or(DEFAULT_INITIAL_DELAY_MS);
        let max_delay_ms = retry
            .and_then(|r| r.max_delay_ms)
            .unwrap_or(DEFAULT_MAX_DELAY_MS.max(initial_delay_ms));
        if max_delay_ms < initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_delay_ms",
                reason: "must not be smaller than retry.initial_delay_ms",
            });
        }

        let stale_after_secs = self
            .cache
            .as_ref()
            .and_then(|c| c.stale_after_secs)
            .unwrap_or(DEFAULT_STALE_AFTER_SECS);

        Ok(ResolvedConfig {
            base_url,
            session_token,
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetrySettings {
                max_retries: retry
                    .and_then(|r| r.max_retries)
                    .unwrap_or(DEFAULT_MAX_RETRIES),
                initial_delay: Duration::from_millis(initial_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
            },
            cache_stale_after: Duration::from_secs(stale_after_secs),
        })
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vouch").join("config.toml"))
}
