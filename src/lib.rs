// marginalia - Ask a large language model about text selected in an e-book reader
// Author: kelexine (https://github.com/kelexine)

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

pub use engine::QueryEngine;
pub use error::{AssistError, Result};
