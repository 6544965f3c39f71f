//! Configuration data structures for marginalia.
//!
//! This module defines the schema for the application settings that are not
//! user-editable from the reader: upstream API endpoints, cache and settings
//! file locations, and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Upstream API aggregator settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Location of the persisted user settings record.
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the upstream API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API aggregator.
    /// Default: `https://openrouter.ai/api/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the chat completions endpoint, appended to `base_url`.
    /// Default: `/chat/completions`
    #[serde(default = "default_completions_path")]
    pub completions_path: String,

    /// Path of the model listing endpoint, appended to `base_url`.
    /// Default: `/models`
    #[serde(default = "default_models_path")]
    pub models_path: String,

    /// Whole-request timeout in seconds. `0` disables the timeout.
    /// Default: `120`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection establishment timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Settings for the on-disk response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether responses are cached at all.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path of the JSON cache file.
    /// Default: `~/.marginalia/cache.json`
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// Maximum number of cached responses kept.
    /// Default: `100`
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// Settings for the persisted user settings record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Path of the JSON settings document.
    /// Default: `~/.marginalia/settings.json`
    #[serde(default = "default_settings_path")]
    pub path: String,

    /// Key under which the record is stored inside the document.
    /// Default: `marginalia`
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl ApiConfig {
    pub fn completions_url(&self) -> String {
        join_url(&self.base_url, &self.completions_path)
    }

    pub fn models_url(&self) -> String {
        join_url(&self.base_url, &self.models_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            completions_path: default_completions_path(),
            models_path: default_models_path(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cache_path(),
            max_entries: default_max_entries(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
            namespace: default_namespace(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults
pub(crate) fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".marginalia")
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_completions_path() -> String {
    "/chat/completions".to_string()
}

fn default_models_path() -> String {
    "/models".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> String {
    data_dir().join("cache.json").to_string_lossy().to_string()
}

fn default_max_entries() -> usize {
    100
}

fn default_settings_path() -> String {
    data_dir().join("settings.json").to_string_lossy().to_string()
}

fn default_namespace() -> String {
    "marginalia".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
