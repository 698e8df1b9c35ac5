//! Application configuration management.
//!
//! Configuration is stored at `~/.config/expense-explorer/config.json` (the
//! platform config directory). Environment variables override the file:
//!
//! - `EXPENSE_EXPLORER_API_URL`: API root, e.g. `https://example.com/api`
//! - `EXPENSE_EXPLORER_USERNAME` / `EXPENSE_EXPLORER_PASSWORD`: login
//!   credentials for non-interactive use
//!
//! The session and preferences live in the platform data directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ClientOptions, DEFAULT_BASE_URL};

/// Application name used for config/data directory paths
const APP_NAME: &str = "expense-explorer";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "EXPENSE_EXPLORER_API_URL";
pub const ENV_USERNAME: &str = "EXPENSE_EXPLORER_USERNAME";
pub const ENV_PASSWORD: &str = "EXPENSE_EXPLORER_PASSWORD";

fn default_timeout_secs() -> u64 {
    30
}

fn default_rate_limit_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default)]
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: default_timeout_secs(),
            max_rate_limit_retries: default_rate_limit_retries(),
            initial_backoff_ms: default_backoff_ms(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Store `username` as the default for the next login. Only the file is
    /// touched, environment overrides are not written back.
    pub fn remember_username(username: &str) -> Result<()> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.last_username = Some(username.to_string());
        config.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override file values with whatever `lookup` finds.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(username) = lookup(ENV_USERNAME).filter(|v| !v.trim().is_empty()) {
            self.last_username = Some(username);
        }
    }

    /// Transport settings for the Session Client.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self
                .api_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_rate_limit_retries: self.max_rate_limit_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the session and preferences are kept.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.client_options().base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client_options().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"api_base_url": "https://money.example/api", "request_timeout_secs": 5}"#)
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        let options = config.client_options();
        assert_eq!(options.base_url, "https://money.example/api");
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.max_rate_limit_retries, 3);
        assert_eq!(options.initial_backoff, Duration::from_millis(1000));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            last_username: Some("maria".to_string()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "http://10.0.0.2:8000/api"),
            (ENV_USERNAME, "sam"),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            api_base_url: Some("http://file/api".to_string()),
            ..Default::default()
        };
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_base_url.as_deref(), Some("http://10.0.0.2:8000/api"));
        assert_eq!(config.last_username.as_deref(), Some("sam"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.api_base_url, None);
        assert_eq!(config.last_username, None);
    }
}
