use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::naming::{DEFAULT_NAME_FORMAT, NameFormatter};
use crate::rpc::RetryPolicy;
use crate::rpc::http::DEFAULT_API_URL;

// Application configuration module
// This module handles loading, validating and saving the client settings.
// Environment variables fill in credentials missing from the file.

/// Environment variable holding the application useragent
pub const USERAGENT_ENV: &str = "OPEN_SUBTITLES_USERAGENT";
/// Environment variable holding the account name
pub const USERNAME_ENV: &str = "OPEN_SUBTITLES_USERNAME";
/// Environment variable holding the account password
pub const PASSWORD_ENV: &str = "OPEN_SUBTITLES_PASSWORD";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// XML-RPC endpoint of the service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Useragent registered for this application
    #[serde(default)]
    pub useragent: Option<String>,

    /// Account name
    #[serde(default)]
    pub username: Option<String>,

    /// Account password
    #[serde(default)]
    pub password: Option<String>,

    /// Interface language sent at login (2-letter code)
    #[serde(default = "default_language")]
    pub language: String,

    /// Backoff settings for overloaded responses
    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Retry/backoff configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Wall-clock budget for one logical call, in seconds
    #[serde(default = "default_retry_timeout_secs")]
    pub timeout_secs: u64,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Multiplier applied to the delay after each retry
    #[serde(default = "default_retry_factor")]
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_retry_timeout_secs(),
            initial_delay_ms: default_initial_delay_ms(),
            factor: default_retry_factor(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            factor: self.factor,
        }
    }
}

/// Configuration for saving subtitles
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadConfig {
    /// File name template, see `naming`
    #[serde(default = "default_name_format")]
    pub name_format: String,

    /// Write through a temporary file and rename
    #[serde(default = "default_true")]
    pub atomic: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            name_format: default_name_format(),
            atomic: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_retry_timeout_secs() -> u64 {
    15
}

fn default_initial_delay_ms() -> u64 {
    1500
}

fn default_retry_factor() -> f64 {
    2.0
}

fn default_name_format() -> String {
    DEFAULT_NAME_FORMAT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: default_api_url(),
            useragent: None,
            username: None,
            password: None,
            language: default_language(),
            retry: RetryConfig::default(),
            http_timeout_secs: default_http_timeout_secs(),
            download: DownloadConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Standard location: `<config dir>/subwire/conf.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("subwire").join("conf.json"))
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load `path` (or the default location) if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        match path {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Fill missing credentials from `lookup` (an environment accessor)
    ///
    /// Values already present in the file win.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.as_deref().is_none_or(str::is_empty) {
                if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                    *slot = Some(value);
                }
            }
        };
        fill(&mut self.useragent, USERAGENT_ENV);
        fill(&mut self.username, USERNAME_ENV);
        fill(&mut self.password, PASSWORD_ENV);
    }

    /// [`apply_env`](Self::apply_env) against the process environment
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_url).with_context(|| format!("Invalid API URL: {}", self.api_url))?;

        if self.language.len() != 2 {
            return Err(anyhow!("Login language must be a 2-letter code, got '{}'", self.language));
        }
        if self.http_timeout_secs == 0 {
            return Err(anyhow!("HTTP timeout must be positive"));
        }
        if self.retry.timeout_secs == 0 || self.retry.initial_delay_ms == 0 {
            return Err(anyhow!("Retry timeout and initial delay must be positive"));
        }
        if !self.retry.factor.is_finite() || self.retry.factor < 1.0 {
            return Err(anyhow!("Retry factor must be at least 1, got {}", self.retry.factor));
        }

        NameFormatter::new(self.download.name_format.clone())
            .map_err(|e| anyhow!("Invalid download name format: {}", e))?;

        Ok(())
    }
}
