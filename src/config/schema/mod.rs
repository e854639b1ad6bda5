use crate::errors::CrmError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend root including the `/api` prefix, e.g. `https://crm.example.com/api`.
    #[serde(default = "default_base_url", rename = "baseUrl")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs", rename = "timeoutSecs")]
    pub timeout_secs: u64,
    #[serde(
        default = "default_connect_timeout_secs",
        rename = "connectTimeoutSecs"
    )]
    pub connect_timeout_secs: u64,
    #[serde(default, rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), CrmError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            CrmError::Config(format!("api.baseUrl '{}' is not a valid URL: {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CrmError::Config(format!(
                "api.baseUrl must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(CrmError::Config(
                "api.baseUrl must not contain a query string or fragment".into(),
            ));
        }
        if url.scheme() == "http" && !is_loopback(&url) {
            warn!("api.baseUrl uses plain http; tokens will be sent unencrypted");
        }
        if self.timeout_secs == 0 {
            return Err(CrmError::Config("api.timeoutSecs must be > 0".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(CrmError::Config("api.connectTimeoutSecs must be > 0".into()));
        }
        if self.connect_timeout_secs > self.timeout_secs {
            return Err(CrmError::Config(
                "api.connectTimeoutSecs must not exceed api.timeoutSecs".into(),
            ));
        }
        Ok(())
    }
}

fn is_loopback(url: &url::Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Session storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Session file; defaults to `<crm home>/session.json`. A leading `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> anyhow::Result<PathBuf> {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => Ok(crate::utils::expand_home(path)),
            _ => Ok(crate::utils::get_crm_home()?.join("session.json")),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CrmError> {
        self.api.validate()
    }
}
