//! Utility functions and helpers for marginalia.
//!
//! # Submodules
//!
//! - `fs`: Whole-file atomic persistence used by the cache and settings stores.
//! - `logging`: Tracing initialization and secret scrubbing for log output.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod fs;
pub mod logging;
