//! Client configuration.
//!
//! Settings come from an optional JSON file at
//! `~/.config/parsergate/config.json`, overridden by environment variables:
//!
//! - `PARSERGATE_API_HOST`: backend base URL (required from one source or the other)
//! - `PARSERGATE_CREDENTIALS`: `include` (default) or `omit`
//! - `PARSERGATE_BEARER_TOKEN`: static bearer token, only when the backend wants one
//! - `PARSERGATE_TIMEOUT_SECS`: request timeout; unset means no client-side timeout

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "parsergate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_HOST: &str = "PARSERGATE_API_HOST";
pub const ENV_CREDENTIALS: &str = "PARSERGATE_CREDENTIALS";
pub const ENV_BEARER_TOKEN: &str = "PARSERGATE_BEARER_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "PARSERGATE_TIMEOUT_SECS";

/// Whether the transport carries the backend-issued session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// Keep an in-memory cookie jar and send it with every request
    #[default]
    Include,
    /// Never store or send cookies
    Omit,
}

impl std::str::FromStr for CredentialMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(CredentialMode::Include),
            "omit" => Ok(CredentialMode::Omit),
            other => bail!("Unknown credential mode '{}' (expected 'include' or 'omit')", other),
        }
    }
}

/// On-disk configuration; every field is optional so env can fill the gaps.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_host: Option<String>,
    pub credentials: Option<CredentialMode>,
    pub bearer_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = get(ENV_API_HOST) {
            self.api_host = Some(host);
        }
        if let Some(mode) = get(ENV_CREDENTIALS) {
            self.credentials = Some(mode.parse::<CredentialMode>().with_context(|| format!("Invalid {}", ENV_CREDENTIALS))?);
        }
        if let Some(token) = get(ENV_BEARER_TOKEN) {
            self.bearer_token = Some(token);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            let secs = secs
                .parse::<u64>()
                .with_context(|| format!("Invalid {}: '{}'", ENV_TIMEOUT_SECS, secs))?;
            self.timeout_secs = Some(secs);
        }
        Ok(self)
    }

    /// Resolve into a validated client configuration.
    pub fn into_client_config(self) -> Result<ClientConfig> {
        let host = self
            .api_host
            .ok_or_else(|| anyhow::anyhow!("No backend URL configured; set {}", ENV_API_HOST))?;

        let mut config = ClientConfig::new(&host)?.with_credentials(self.credentials.unwrap_or_default());
        if let Some(token) = self.bearer_token {
            config = config.with_bearer_token(token);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

/// Validated settings consumed once by the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    pub credentials: CredentialMode,
    pub bearer_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).with_context(|| format!("Invalid backend URL '{}'", base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("Backend URL must use http or https, got '{}'", url.scheme());
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            credentials: CredentialMode::default(),
            bearer_token: None,
            timeout: None,
        })
    }

    pub fn with_credentials(mut self, mode: CredentialMode) -> Self {
        self.credentials = mode;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an endpoint path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
