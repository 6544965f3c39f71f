//! Settings store.
//!
//! `SettingsStore` owns the in-memory settings record and writes it through
//! the injected `SettingsBackend` after every mutation. Until `load()` has
//! run every accessor fails with `SettingsNotInitialized`.

// Author: kelexine (https://github.com/kelexine)

use super::backend::{JsonFileBackend, SettingsBackend};
use super::models::{ApiKey, Settings, TaskPrompt};
use crate::config::SettingsConfig;
use crate::error::{AssistError, Result};
use crate::models::ModelInfo;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    namespace: String,
    current: RwLock<Option<Settings>>,
}

impl SettingsStore {
    pub fn new(backend: impl SettingsBackend + 'static, namespace: impl Into<String>) -> Self {
        Self {
            backend: Box::new(backend),
            namespace: namespace.into(),
            current: RwLock::new(None),
        }
    }

    /// Store backed by the JSON settings file named in the configuration.
    pub fn from_config(config: &SettingsConfig) -> Self {
        Self::new(JsonFileBackend::new(&config.path), config.namespace.clone())
    }

    /// Read the saved record and install it as the current settings.
    ///
    /// A missing record yields the defaults. A record that does not
    /// deserialize is logged and replaced by the defaults. Backend I/O
    /// failures are returned.
    pub fn load(&self) -> Result<()> {
        let settings = match self.backend.read(&self.namespace)? {
            None => {
                debug!("No saved settings under '{}', using defaults", self.namespace);
                Settings::default()
            }
            Some(record) => match serde_json::from_value::<Settings>(record) {
                Ok(saved) => Settings::from_saved(saved),
                Err(e) => {
                    warn!("Saved settings are unreadable, using defaults: {}", e);
                    Settings::default()
                }
            },
        };

        info!(
            "Settings loaded (model: {}, api key set: {}, {} tasks)",
            if settings.selected_model.is_empty() { "<none>" } else { settings.selected_model.as_str() },
            !settings.api_key.is_empty(),
            settings.task_prompts.len()
        );

        *self.current.write() = Some(settings);
        Ok(())
    }

    /// Write the current settings through the backend.
    pub fn save(&self) -> Result<()> {
        let current = self.current.read();
        let settings = current.as_ref().ok_or(AssistError::SettingsNotInitialized)?;
        self.persist(settings)
    }

    fn persist(&self, settings: &Settings) -> Result<()> {
        let record = serde_json::to_value(settings)?;
        self.backend.write(&self.namespace, &record)
    }

    /// Apply `change` to the current settings and persist the result.
    fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Settings) -> Result<()>,
    {
        let mut current = self.current.write();
        let settings = current.as_mut().ok_or(AssistError::SettingsNotInitialized)?;
        change(settings)?;
        self.persist(settings)
    }

    fn read<T>(&self, f: impl FnOnce(&Settings) -> T) -> Result<T> {
        self.current
            .read()
            .as_ref()
            .map(f)
            .ok_or(AssistError::SettingsNotInitialized)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// A copy of the whole current record.
    pub fn snapshot(&self) -> Result<Settings> {
        self.read(Settings::clone)
    }

    pub fn api_key(&self) -> Result<ApiKey> {
        self.read(|s| s.api_key.clone())
    }

    pub fn selected_model(&self) -> Result<String> {
        self.read(|s| s.selected_model.clone())
    }

    pub fn system_prompt(&self) -> Result<String> {
        self.read(|s| s.system_prompt.clone())
    }

    pub fn models(&self) -> Result<Vec<ModelInfo>> {
        self.read(|s| s.models.clone())
    }

    pub fn task_prompts(&self) -> Result<Vec<TaskPrompt>> {
        self.read(|s| s.task_prompts.clone())
    }

    pub fn task_prompt(&self, name: &str) -> Result<Option<TaskPrompt>> {
        self.read(|s| s.task_prompt(name).cloned())
    }

    pub fn set_api_key(&self, key: impl Into<String>) -> Result<()> {
        let key = ApiKey::new(key.into().trim());
        self.update(|s| {
            s.api_key = key;
            Ok(())
        })
    }

    pub fn set_selected_model(&self, model: impl Into<String>) -> Result<()> {
        let model = model.into();
        self.update(|s| {
            debug!("Selected model: {}", model);
            s.selected_model = model;
            Ok(())
        })
    }

    /// Replace the model catalog wholesale.
    pub fn set_models(&self, models: Vec<ModelInfo>) -> Result<()> {
        self.update(|s| {
            if !s.selected_model.is_empty() && !models.iter().any(|m| m.id == s.selected_model) {
                warn!(
                    "Selected model {} is not in the refreshed catalog; keeping it",
                    s.selected_model
                );
            }
            s.models = models;
            Ok(())
        })
    }

    /// Change the prompt of an existing task.
    pub fn set_task_prompt(&self, name: &str, prompt: impl Into<String>) -> Result<()> {
        let prompt = prompt.into();
        self.update(|s| {
            let task = s
                .task_prompts
                .iter_mut()
                .find(|t| t.name == name)
                .ok_or_else(|| AssistError::UnknownTask(name.to_string()))?;
            task.prompt = prompt;
            Ok(())
        })
    }
}
