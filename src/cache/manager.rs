// Response cache - bounded, timestamp-ordered store persisted as one JSON file
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{CacheConfig, CacheEntry, CacheStats};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Cache of model completions keyed by fingerprint.
///
/// The whole store lives in memory and is rewritten to disk after every
/// insert. The store mutex is held across upsert, eviction and the file
/// rewrite, so a follow-up query can never interleave with a save in
/// progress.
///
/// Entries are kept in key order. Eviction ranks them newest-first with a
/// stable sort, so entries sharing a timestamp are retained in key order.
pub struct ResponseCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: BTreeMap<String, CacheEntry>,
    stats: CacheStats,
}

impl ResponseCache {
    /// Open the cache, loading any persisted store.
    ///
    /// Never fails: a missing file yields an empty cache, and unreadable or
    /// corrupt content is logged and replaced by an empty cache.
    pub fn load(config: CacheConfig) -> Self {
        let entries = match &config.path {
            Some(path) if config.enabled => Self::load_from_disk(path),
            _ => BTreeMap::new(),
        };

        debug!("Response cache opened with {} entries", entries.len());
        crate::metrics::update_cache_entries(entries.len());

        let stats = CacheStats {
            entries: entries.len(),
            ..CacheStats::default()
        };

        Self {
            config,
            state: Mutex::new(CacheState { entries, stats }),
        }
    }

    /// Create a cache that is never persisted.
    pub fn in_memory(max_entries: usize) -> Self {
        Self::load(CacheConfig {
            enabled: true,
            path: None,
            max_entries,
        })
    }

    fn load_from_disk(path: &Path) -> BTreeMap<String, CacheEntry> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache file at {}, starting empty", path.display());
                return BTreeMap::new();
            }
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                return BTreeMap::new();
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(raw)) => {
                let now = chrono::Utc::now().timestamp();
                Self::repair_entries(raw, now)
            }
            Ok(_) => {
                warn!("Cache file {} is not a JSON object, discarding", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Cache file {} is corrupt, discarding: {}", path.display(), e);
                BTreeMap::new()
            }
        }
    }

    /// Converts raw persisted values into entries.
    ///
    /// Legacy plain-string values and records without a positive integer
    /// timestamp are stamped with `now`. Values without a response string are
    /// dropped.
    fn repair_entries(
        raw: serde_json::Map<String, Value>,
        now: i64,
    ) -> BTreeMap<String, CacheEntry> {
        let mut entries = BTreeMap::new();
        let mut repaired = 0usize;
        let mut dropped = 0usize;

        for (key, value) in raw {
            let entry = match value {
                Value::String(response) => {
                    repaired += 1;
                    CacheEntry {
                        response,
                        timestamp: now,
                    }
                }
                Value::Object(record) => {
                    let Some(response) = record.get("response").and_then(Value::as_str) else {
                        dropped += 1;
                        continue;
                    };
                    let timestamp = match record
                        .get("timestamp")
                        .and_then(Value::as_i64)
                        .filter(|t| *t > 0)
                    {
                        Some(t) => t,
                        None => {
                            repaired += 1;
                            now
                        }
                    };
                    CacheEntry {
                        response: response.to_string(),
                        timestamp,
                    }
                }
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            entries.insert(key, entry);
        }

        if repaired > 0 || dropped > 0 {
            warn!(
                "Repaired {} and dropped {} malformed cache entries",
                repaired, dropped
            );
        }

        entries
    }

    /// Look up an entry, recording a hit or miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        if !self.config.enabled {
            return None;
        }

        let mut state = self.state.lock();
        match state.entries.get(key).cloned() {
            Some(entry) => {
                state.stats.hits += 1;
                crate::metrics::record_cache_hit();
                debug!("Cache hit ({} chars)", entry.response.len());
                Some(entry)
            }
            None => {
                state.stats.misses += 1;
                crate::metrics::record_cache_miss();
                debug!("Cache miss");
                None
            }
        }
    }

    /// Look up an entry without touching statistics.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        if !self.config.enabled {
            return None;
        }
        self.state.lock().entries.get(key).cloned()
    }

    /// Store `response` under `key`, stamped with the current time.
    pub fn put(&self, key: &str, response: &str) {
        self.put_with_timestamp(key, response, chrono::Utc::now().timestamp());
    }

    /// Store `response` under `key` with an explicit timestamp, evict down to
    /// the size bound, then rewrite the cache file.
    pub fn put_with_timestamp(&self, key: &str, response: &str, timestamp: i64) {
        if !self.config.enabled {
            return;
        }

        let mut state = self.state.lock();
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                response: response.to_string(),
                timestamp,
            },
        );
        state.stats.inserts += 1;
        crate::metrics::record_cache_insert();

        let evicted = Self::evict_oldest(&mut state.entries, self.config.max_entries);
        if evicted > 0 {
            debug!("Evicted {} cache entries", evicted);
            state.stats.evictions += evicted as u64;
            crate::metrics::record_cache_evictions(evicted);
        }

        state.stats.entries = state.entries.len();
        crate::metrics::update_cache_entries(state.entries.len());

        self.persist(&state.entries);
    }

    /// Keep the `limit` newest entries and drop the rest. Returns how many
    /// entries were removed.
    fn evict_oldest(entries: &mut BTreeMap<String, CacheEntry>, limit: usize) -> usize {
        if entries.len() <= limit {
            return 0;
        }

        let mut ranked: Vec<(&String, i64)> =
            entries.iter().map(|(key, e)| (key, e.timestamp)).collect();
        // Stable: equal timestamps stay in key order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let doomed: Vec<String> = ranked
            .into_iter()
            .skip(limit)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.remove(key);
        }

        doomed.len()
    }

    /// Rewrite the whole store. Failures are logged and otherwise ignored.
    fn persist(&self, entries: &BTreeMap<String, CacheEntry>) {
        let Some(path) = &self.config.path else {
            return;
        };

        let result = serde_json::to_vec_pretty(entries)
            .map_err(std::io::Error::from)
            .and_then(|bytes| crate::utils::fs::write_atomic(path, &bytes));

        match result {
            Ok(()) => debug!("Persisted {} cache entries to {}", entries.len(), path.display()),
            Err(e) => warn!("Failed to persist cache to {}: {}", path.display(), e),
        }
    }

    /// Drop every entry and persist the empty store. A disabled cache
    /// leaves the file on disk untouched.
    pub fn clear(&self) {
        if !self.config.enabled {
            return;
        }
        let mut state = self.state.lock();
        state.entries.clear();
        state.stats.entries = 0;
        crate::metrics::update_cache_entries(0);
        self.persist(&state.entries);
        debug!("Cache cleared");
    }

    /// Keys currently stored, in key order.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.config.max_entries
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }
}
