// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{AssistError, Result};
use config::{Config, Environment, File};
use std::path::Path;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest, `MARGINALIA__CACHE__MAX_ENTRIES=50`)
    /// 2. Config file (`~/.marginalia/config.toml` unless overridden)
    /// 3. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = path
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(Self::default_config_path);

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // Load from config file if it exists
            .add_source(File::with_name(&file_path).required(path.is_some()))
            // Override with environment variables
            .add_source(
                Environment::with_prefix("MARGINALIA")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| AssistError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AssistError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        models::data_dir()
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
