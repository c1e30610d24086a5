//! Client configuration: API key, base URL and request timeout.
//!
//! Loaded from a TOML document or from `INTHEAM_*` environment variables.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root of the public inthe.am API.
pub const BASE_URL: &str = "https://inthe.am/api/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Configuration for `api_key` against the public API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: api_key.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `INTHEAM_API_KEY`, `INTHEAM_BASE_URL` and `INTHEAM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("INTHEAM_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup("INTHEAM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup("INTHEAM_TIMEOUT_SECS") {
            config.timeout_secs = raw.parse().map_err(|e| ConfigError::InvalidValue {
                field: "timeout_secs",
                reason: format!("{raw:?}: {e}"),
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: format!("{:?} is not an http(s) URL", self.base_url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
