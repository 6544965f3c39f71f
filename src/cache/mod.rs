// Response cache module
// Author: kelexine (https://github.com/kelexine)

pub mod key;
pub mod manager;
pub mod models;

pub use key::{fingerprint, history_fingerprint, HISTORY_TASK, KEY_SEPARATOR};
pub use manager::ResponseCache;
pub use models::{CacheConfig, CacheEntry, CacheStats};
