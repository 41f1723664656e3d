//! Shell configuration
//!
//! Loaded from `shell.toml` in the user config directory, then overridden by
//! environment variables and finally command-line flags.

use anyhow::{Context, Result};
use mothership_sync::{TransportConfig, DEFAULT_API_BASE, DEFAULT_NOTIFICATION_CAP};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_BASE: &str = "MOTHERSHIP_API_BASE";
pub const ENV_LOG_LEVEL: &str = "MOTHERSHIP_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub log_level: String,
    pub notification_cap: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
            notification_cap: DEFAULT_NOTIFICATION_CAP,
        }
    }
}

impl ShellConfig {
    /// `$CONFIG_DIR/mothership-studio/shell.toml`
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("mothership-studio");
        path.push("shell.toml");
        Some(path)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid shell configuration")
    }

    /// Read `explicit` if given (it must exist), else the default location if
    /// present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply `MOTHERSHIP_*` overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_base) = lookup(ENV_API_BASE).filter(|v| !v.is_empty()) {
            self.api_base = api_base;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            api_base: self.api_base.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..TransportConfig::default()
        }
    }
}
