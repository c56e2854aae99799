/// Application configuration management
/// Stores user preferences in ~/.config/registry-cli/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{APP_DIR_NAME, DEFAULT_BASE_URL};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registry API base URL
    pub base_url: Option<String>,
    /// Offer the log viewer (defaults to enabled)
    pub log_streaming: Option<bool>,
}

impl AppConfig {
    /// Get config directory, creating it if needed
    pub fn config_dir() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => {
                let home = std::env::var("HOME")
                    .context("HOME environment variable not set")?;
                PathBuf::from(home).join(".config")
            }
        };
        let config_dir = base.join(APP_DIR_NAME);

        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Resolve the registry URL: command line, then environment, then config file
    pub fn resolve_base_url(&self, cli_url: Option<&str>, env_url: Option<&str>) -> String {
        // A blank source (e.g. `REGISTRY_URL=` in .env) counts as unset
        [cli_url, env_url, self.base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    /// Log streaming is on unless disabled on the command line or in the config file
    pub fn log_streaming_enabled(&self, cli_disabled: bool) -> bool {
        !cli_disabled && self.log_streaming.unwrap_or(true)
    }
}
