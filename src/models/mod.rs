//! Data models for the upstream API aggregator.
//!
//! This module contains the type definitions for request/response bodies used by:
//! - The chat completions endpoint (`chat`)
//! - The model listing endpoint (`catalog`)

// Author: kelexine (https://github.com/kelexine)

pub mod catalog;
pub mod chat;

pub use catalog::{ModelInfo, ModelListResponse, Pricing};
pub use chat::{ChatMessage, ChatRequest, Role};
