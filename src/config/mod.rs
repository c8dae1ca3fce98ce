//! Configuration system for clusterwatch
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/clusterwatch/config.{CLUSTERWATCH_ENV}.json
//! 3. Default values
//!
//! Where CLUSTERWATCH_ENV can be: production (default), development, test
//!
//! # Examples
//!
//! ```no_run
//! use clusterwatch::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! println!("Polling {} every {}s", config.api.base_url, config.poll_interval_secs);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - CLUSTERWATCH_API_URL
//! - CLUSTERWATCH_API_TOKEN
//! - CLUSTERWATCH_ORGANIZATION
//! - CLUSTERWATCH_CONSOLE_URL

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::progress::steps::DEFAULT_COMPLETION_PHRASE;
use crate::tracking::DEFAULT_TRACKING_TTL_HOURS;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Console API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Bearer token (can be an environment variable name like "CLUSTERWATCH_TOKEN")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.qovery.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    /// Resolve the token from the environment if it names a variable
    pub fn resolve_token(&self) -> Option<String> {
        self.token.as_ref().and_then(|token| {
            if !token.is_empty() && token.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                std::env::var(token).ok()
            } else {
                Some(token.clone())
            }
        })
    }
}

/// Desktop notification and sound preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Show a desktop notification when a tracked installation finishes
    #[serde(default = "default_true")]
    pub desktop: bool,

    /// Play the completion sound on success
    #[serde(default)]
    pub sound: bool,

    /// Audio file played on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_path: Option<PathBuf>,

    /// Playback volume (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_true() -> bool {
    true
}

fn default_volume() -> f32 {
    0.6
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            sound: false,
            sound_path: None,
            volume: default_volume(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    /// Console base URL used for notification deep links
    #[serde(default = "default_console_url")]
    pub console_url: String,

    /// Organization watched by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Log polling interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Hours after which an unobserved tracked installation is dropped
    #[serde(default = "default_tracking_ttl")]
    pub tracking_ttl_hours: i64,

    /// Log phrase announcing a finished installation
    #[serde(default = "default_completion_phrase")]
    pub completion_phrase: String,

    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Where tracked installations are persisted (defaults to the data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

fn default_console_url() -> String {
    "https://console.qovery.com".to_string()
}

fn default_poll_interval() -> u64 {
    3
}

fn default_tracking_ttl() -> i64 {
    DEFAULT_TRACKING_TTL_HOURS
}

fn default_completion_phrase() -> String {
    DEFAULT_COMPLETION_PHRASE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            console_url: default_console_url(),
            organization_id: None,
            poll_interval_secs: default_poll_interval(),
            tracking_ttl_hours: default_tracking_ttl(),
            completion_phrase: default_completion_phrase(),
            notifications: NotificationConfig::default(),
            data_dir: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/clusterwatch/config.{CLUSTERWATCH_ENV}.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("CLUSTERWATCH_ENV").unwrap_or_else(|_| "production".to_string());

        if let Some(config_dir) = Self::config_dir() {
            let config_path = config_dir.join(format!("config.{}.json", env));

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CLUSTERWATCH_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(token) = std::env::var("CLUSTERWATCH_API_TOKEN") {
            self.api.token = Some(token);
        }

        if let Ok(organization) = std::env::var("CLUSTERWATCH_ORGANIZATION") {
            self.organization_id = Some(organization);
        }

        if let Ok(url) = std::env::var("CLUSTERWATCH_CONSOLE_URL") {
            self.console_url = url;
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url cannot be empty".to_string(),
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.console_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "console_url cannot be empty".to_string(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.tracking_ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "tracking_ttl_hours must be greater than 0".to_string(),
            ));
        }

        if self.completion_phrase.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "completion_phrase cannot be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.notifications.volume) {
            return Err(ConfigError::ValidationError(format!(
                "notifications.volume must be between 0.0 and 1.0, got {}",
                self.notifications.volume
            )));
        }

        Ok(())
    }

    /// Debug logging is on when either the CLI flag or the config asks for it
    pub fn verbose_logging(&self, cli_verbose: bool) -> bool {
        cli_verbose || self.debug
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("clusterwatch"))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval_secs, 3);
        assert_eq!(config.tracking_ttl_hours, 24);
        assert!(config.notifications.desktop);
        assert!(!config.notifications.sound);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.notifications.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.completion_phrase = "   ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.tracking_ttl_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"organization_id":"org-1","notifications":{"sound":true}}"#)
                .unwrap();
        assert_eq!(config.organization_id.as_deref(), Some("org-1"));
        assert!(config.notifications.sound);
        assert!(config.notifications.desktop);
        assert!((config.notifications.volume - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.completion_phrase, DEFAULT_COMPLETION_PHRASE);
    }

    #[test]
    fn test_debug_flag_enables_verbose_logging() {
        let config: AppConfig = serde_json::from_str(r#"{"debug":true}"#).unwrap();
        assert!(config.verbose_logging(false));

        let config = AppConfig::default();
        assert!(!config.verbose_logging(false));
        assert!(config.verbose_logging(true));
    }

    #[test]
    fn test_literal_token_is_kept() {
        let api = ApiConfig {
            token: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(api.resolve_token().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_save_and_load_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.poll_interval_secs = 10;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.poll_interval_secs, 10);
        assert!(AppConfig::load(Some(&temp_dir.path().join("missing.json"))).is_err());
    }
}
