//! Response cache entry, configuration and statistics models.

// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A cached model completion, stored under its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The completion text returned by the model.
    pub response: String,
    /// Unix timestamp (seconds) of the insert. Eviction drops the smallest first.
    pub timestamp: i64,
}

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled. A disabled cache never stores or returns entries.
    pub enabled: bool,
    /// File the store is persisted to. `None` keeps the cache in memory only.
    pub path: Option<PathBuf>,
    /// Maximum number of entries retained after every insert.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    /// Provides default values for cache configuration.
    ///
    /// - `enabled`: true
    /// - `path`: None
    /// - `max_entries`: 100
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            max_entries: 100,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            path: Some(PathBuf::from(&settings.path)),
            max_entries: settings.max_entries,
        }
    }
}

/// Statistics for cache operations since the cache was opened.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups that found an entry.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of entries written.
    pub inserts: u64,
    /// Number of entries dropped by the size bound.
    pub evictions: u64,
    /// Entries currently stored.
    pub entries: usize,
}
