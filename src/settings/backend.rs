// Key/value persistence backends for the settings record
// Author: kelexine (https://github.com/kelexine)

use crate::error::{AssistError, Result};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Host-provided storage for namespaced settings records.
pub trait SettingsBackend: Send + Sync {
    /// Read the record stored under `namespace`, if any.
    fn read(&self, namespace: &str) -> Result<Option<Value>>;

    /// Replace the record stored under `namespace`.
    fn write(&self, namespace: &str, value: &Value) -> Result<()>;
}

impl<T: SettingsBackend + ?Sized> SettingsBackend for Arc<T> {
    fn read(&self, namespace: &str) -> Result<Option<Value>> {
        (**self).read(namespace)
    }

    fn write(&self, namespace: &str, value: &Value) -> Result<()> {
        (**self).write(namespace, value)
    }
}

/// A JSON document mapping namespaces to records, rewritten whole on every
/// write.
pub struct JsonFileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole document. A missing or unparsable file reads as empty.
    fn read_document(&self) -> Result<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(AssistError::Settings(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) | Err(_) => {
                warn!(
                    "Settings file {} is not a JSON object, treating as empty",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }
}

impl SettingsBackend for JsonFileBackend {
    fn read(&self, namespace: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock();
        Ok(self.read_document()?.remove(namespace))
    }

    fn write(&self, namespace: &str, value: &Value) -> Result<()> {
        let _guard = self.lock.lock();

        let mut document = self.read_document()?;
        document.insert(namespace.to_string(), value.clone());

        let bytes = serde_json::to_vec_pretty(&Value::Object(document))?;
        crate::utils::fs::write_private(&self.path, &bytes).map_err(|e| {
            AssistError::Settings(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        debug!("Saved settings namespace '{}' to {}", namespace, self.path.display());
        Ok(())
    }
}

/// Settings kept only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` already stored under `namespace`.
    pub fn with_record(namespace: &str, value: Value) -> Self {
        let backend = Self::default();
        backend.records.lock().insert(namespace.to_string(), value);
        backend
    }
}

impl SettingsBackend for MemoryBackend {
    fn read(&self, namespace: &str) -> Result<Option<Value>> {
        Ok(self.records.lock().get(namespace).cloned())
    }

    fn write(&self, namespace: &str, value: &Value) -> Result<()> {
        self.records
            .lock()
            .insert(namespace.to_string(), value.clone());
        Ok(())
    }
}
