//! Configuration loading and service URL resolution
//!
//! Priority order for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Analysis Service base URL used when nothing else is configured
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Environment variable overriding the service base URL
pub const ENV_SERVICE_URL: &str = "MUSICATION_API_URL";

/// Environment variable overriding the config file location
pub const ENV_CONFIG_PATH: &str = "MUSICATION_CONFIG";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Analysis Service base URL
    pub service_url: Option<String>,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

/// Polling budget for the job lifecycle controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between consecutive status polls (milliseconds)
    pub interval_ms: u64,
    /// Non-terminal statuses tolerated before giving up
    pub max_attempts: u32,
    /// Consecutive failed status checks tolerated before giving up
    pub max_error_retries: u32,
    /// Per-request HTTP timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            max_attempts: 60,
            max_error_retries: 3,
            request_timeout_secs: 30,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject zero budgets
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::Config(
                "polling.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config(
                "polling.max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.max_error_retries == 0 {
            return Err(Error::Config(
                "polling.max_error_retries must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "polling.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Locate the config file: CLI path → `MUSICATION_CONFIG` → platform config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// `~/.config/musication/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("musication").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if present, degrading to defaults on any problem
///
/// The problem is returned rather than logged so callers can report it once
/// their logging is set up. A missing file at the platform default location
/// is normal; a missing file anywhere else was named by the user and is a problem.
pub fn load_or_default(path: Option<&Path>) -> (TomlConfig, Option<Error>) {
    let Some(path) = path else {
        debug!("No config directory available, using defaults");
        return (TomlConfig::default(), None);
    };

    if !path.exists() {
        if default_config_path().as_deref() == Some(path) {
            debug!("Config file {} not found, using defaults", path.display());
            return (TomlConfig::default(), None);
        }
        let problem = Error::Config(format!("Config file {} not found", path.display()));
        return (TomlConfig::default(), Some(problem));
    }

    match load_toml_config(path) {
        Ok(config) => (config, None),
        Err(e) => (TomlConfig::default(), Some(e)),
    }
}

/// Write a config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve the service base URL: CLI → `MUSICATION_API_URL` → TOML → default
///
/// Trailing slashes are removed so paths can be appended directly.
pub fn resolve_service_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let env_value = std::env::var(ENV_SERVICE_URL).ok();

    let url = cli_arg
        .map(str::to_string)
        .or(env_value)
        .or_else(|| toml_config.service_url.clone())
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

    let url = url.trim().trim_end_matches('/').to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Service URL must start with http:// or https://, got '{}'",
            url
        )));
    }
    Ok(url)
}
