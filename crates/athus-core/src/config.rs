//! Application configuration management.
//!
//! This module handles loading and saving the client configuration:
//! backend URL, ViaCEP URL, where tokens are stored, request timeout and
//! the last email used to log in.
//!
//! Configuration is stored at `~/.config/athus/config.json`. The
//! `ATHUS_BASE_URL` environment variable overrides the backend URL.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "athus";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the backend URL
pub const BASE_URL_ENV: &str = "ATHUS_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://felipemariano.com.br:8080/ProjetoAthus";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where session tokens are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSON file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub viacep_url: Option<String>,
    #[serde(default)]
    pub store: StoreKind,
    pub request_timeout_secs: Option<u64>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: environment, then config file, then the default
    pub fn base_url(&self) -> String {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn viacep_url(&self) -> String {
        self.viacep_url
            .clone()
            .unwrap_or_else(|| crate::api::address::VIACEP_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store, StoreKind::File);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.viacep_url(), "https://viacep.com.br/ws");
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config =
            serde_json::from_str(r#"{"base_url":"http://localhost:8080","store":"keyring"}"#)
                .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.store, StoreKind::Keyring);
        assert!(config.last_email.is_none());
    }
}
