// User settings module
// Author: kelexine (https://github.com/kelexine)

pub mod backend;
mod models;
mod store;

pub use backend::{JsonFileBackend, MemoryBackend, SettingsBackend};
pub use models::*;
pub use store::SettingsStore;
