//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the upstream endpoint settings and the last used username.
//!
//! Configuration is stored at `~/.config/inboxkeeper/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application name used for config directory paths
const APP_NAME: &str = "inboxkeeper";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BASE_URL: &str = "https://www.wattpad.com";

/// The upstream serves a reduced site to unknown clients, so every request
/// presents itself as desktop Chrome.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Successful logins are reused for two days.
const DEFAULT_LOGIN_CACHE_TTL_HOURS: u64 = 48;

/// Upper bound on pages followed for a single inbox or thread.
/// At 20 threads per page this is 10k conversations.
const DEFAULT_MAX_PAGES: usize = 500;

const DEFAULT_SESSION_TTL_MINUTES: i64 = 24 * 60;

const DEFAULT_MAX_SESSIONS: usize = 10_000;

pub const ENV_BASE_URL: &str = "INBOXKEEPER_BASE_URL";
pub const ENV_MAX_PAGES: &str = "INBOXKEEPER_MAX_PAGES";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid base URL {0:?}")]
    InvalidBaseUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub login_cache_ttl_hours: u64,
    pub max_pages: usize,
    pub session_ttl_minutes: i64,
    pub max_sessions: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            login_cache_ttl_hours: DEFAULT_LOGIN_CACHE_TTL_HOURS,
            max_pages: DEFAULT_MAX_PAGES,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl UpstreamConfig {
    /// Default settings pointed at a different upstream host
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        if self.login_cache_ttl_hours == 0 {
            return Err(ConfigError::Zero("login_cache_ttl_hours"));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Zero("max_pages"));
        }
        if self.session_ttl_minutes <= 0 {
            return Err(ConfigError::Zero("session_ttl_minutes"));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Zero("max_sessions"));
        }
        Ok(())
    }

    /// Parsed base URL, without a trailing slash in its path
    pub fn base(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn login_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.login_cache_ttl_hours * 60 * 60)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }

    /// Apply `INBOXKEEPER_*` overrides from the given lookup.
    ///
    /// Nothing is changed unless every override parses.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL);
        let max_pages = match lookup(ENV_MAX_PAGES) {
            Some(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_MAX_PAGES,
                value: raw.clone(),
            })?),
            None => None,
        };

        if let Some(url) = base_url {
            self.base_url = url;
        }
        if let Some(max_pages) = max_pages {
            self.max_pages = max_pages;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Upstream settings for this run: the saved ones plus environment
    /// overrides. The overrides stay out of `self` so `save` never writes them.
    pub fn effective_upstream<F>(&self, lookup: F) -> Result<UpstreamConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut upstream = self.upstream.clone();
        upstream.apply_env(lookup)?;
        Ok(upstream)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
