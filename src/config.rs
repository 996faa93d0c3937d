//! Client configuration.
//!
//! Settings for reaching the hosted backend and for persisting the session
//! between runs.
//!
//! # Example
//!
//! ```ignore
//! use tenantdash::config::ClientConfig;
//!
//! let config = ClientConfig::new("https://project.example.co", "anon-key")?
//!     .with_request_timeout(Duration::from_secs(5));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::SessionFile;
use crate::error::ConfigError;

/// Backend URL variable.
pub const ENV_URL: &str = "TENANTDASH_URL";
/// Public (anon) API key variable.
pub const ENV_ANON_KEY: &str = "TENANTDASH_ANON_KEY";
/// Session file override variable.
pub const ENV_SESSION_FILE: &str = "TENANTDASH_SESSION_FILE";
/// Request timeout override, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "TENANTDASH_TIMEOUT_SECS";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for [`crate::adapters::RestClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash
    pub base_url: String,
    /// Public API key sent as the `apikey` header
    pub anon_key: String,
    /// Where the session is persisted; `None` keeps it in memory only
    pub session_file: Option<PathBuf>,
    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a config with in-memory session storage.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = normalize_url(base_url.into())?;
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_ANON_KEY));
        }

        Ok(Self {
            base_url,
            anon_key,
            session_file: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Persist the session at `path`.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Keep the session in memory only.
    pub fn without_session_file(mut self) -> Self {
        self.session_file = None;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the config from `TENANTDASH_*` environment variables.
    ///
    /// The session file defaults to `~/.tenantdash/session.json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let mut config = Self::new(required(ENV_URL)?, required(ENV_ANON_KEY)?)?;

        config.session_file = match lookup(ENV_SESSION_FILE).filter(|v| !v.trim().is_empty()) {
            Some(path) => Some(PathBuf::from(path)),
            None => SessionFile::default_path(),
        };

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidNumber {
                    name: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn normalize_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    let parsed = reqwest::Url::parse(&trimmed).map_err(|e| ConfigError::InvalidUrl {
        value: raw.clone(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed),
        other => Err(ConfigError::InvalidUrl {
            value: raw,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
