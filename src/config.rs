use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::agent::AgentMode;

/// Environment variable selecting the API base URL
pub const BASE_URL_ENV: &str = "COURTOPS_API_BASE_URL";

/// Base URL used when neither the environment nor the config file names one
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub downloads: DownloadsConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL; the environment variable takes precedence
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File the bearer token is persisted in
    #[serde(default = "default_token_file")]
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    /// Directory saved reports and exports land in
    #[serde(default = "default_download_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Initial mode selection in the console
    #[serde(default)]
    pub mode: AgentMode,

    /// Initial dry-run selection in the console
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    /// Preset submitted by the preset action
    #[serde(default = "default_preset")]
    pub preset: String,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_token_file() -> String {
    "~/.courtops/session.json".to_string()
}

fn default_download_dir() -> String {
    ".".to_string()
}

fn default_dry_run() -> bool {
    true
}

fn default_preset() -> String {
    crate::agent::DAILY_OPS_PRESET.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: AgentMode::default(),
            dry_run: default_dry_run(),
            preset: default_preset(),
        }
    }
}

impl ApiConfig {
    /// Base URL after environment override, fallback, and normalization
    pub fn resolved_base_url(&self) -> String {
        resolve_base_url(std::env::var(BASE_URL_ENV).ok(), self.base_url.as_deref())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl SessionConfig {
    pub fn token_path(&self) -> PathBuf {
        expand_tilde(&self.token_file)
    }
}

impl DownloadsConfig {
    pub fn dir_path(&self) -> PathBuf {
        expand_tilde(&self.dir)
    }
}

impl Config {
    /// Load config from file, or return defaults if file doesn't exist
    pub fn load(path: &str) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&expanded_path).context("Failed to read config file")?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Get the default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courtops")
            .join("config.toml")
    }
}

/// Pick the base URL: environment, then config file, then the fixed fallback
pub fn resolve_base_url(env: Option<String>, configured: Option<&str>) -> String {
    let raw = env
        .filter(|v| !v.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    normalize_base_url(raw.trim())
}

/// Strip trailing slashes so paths can be appended verbatim
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
