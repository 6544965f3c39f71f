//! User settings record and its built-in defaults.
//!
//! The record is what the reader edits from the settings dialog: the API
//! key, the selected model, the fetched model catalog and the prompt of
//! each task. The system prompt is shipped with the application and is not
//! user-editable.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::models::ModelInfo;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// System prompt sent as the first message of every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful reading assistant. \
The user is reading a book and has selected a passage from it. \
Answer clearly and concisely in plain text, without Markdown formatting.";

/// Built-in tasks as `(name, prompt)` pairs, in display order.
pub const DEFAULT_TASKS: &[(&str, &str)] = &[
    (
        "Explain",
        "Explain the following text in simple terms, including any background a reader needs to understand it.",
    ),
    (
        "Summarize",
        "Summarize the following text in a few sentences, keeping its key points.",
    ),
    (
        "Translate",
        "Translate the following text into English, preserving its tone.",
    ),
];

/// API key for the aggregator. Wiped from memory on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Custom Debug impl that never logs the key
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey([REDACTED])")
        }
    }
}

/// A named prompt the reader can run against a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPrompt {
    pub name: String,
    pub prompt: String,
}

impl TaskPrompt {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}

/// The persisted settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: ApiKey,
    pub selected_model: String,
    pub system_prompt: String,
    pub models: Vec<ModelInfo>,
    pub task_prompts: Vec<TaskPrompt>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            selected_model: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            models: Vec::new(),
            task_prompts: default_task_prompts(),
        }
    }
}

impl Settings {
    /// Build the in-memory settings from a saved record.
    ///
    /// Saved task prompts are merged into the built-in set by name and the
    /// system prompt is always reset to the built-in one, so prompt changes
    /// ship with application updates.
    pub fn from_saved(saved: Settings) -> Self {
        Self {
            task_prompts: merge_task_prompts(&saved.task_prompts),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            api_key: saved.api_key,
            selected_model: saved.selected_model,
            models: saved.models,
        }
    }

    pub fn task_prompt(&self, name: &str) -> Option<&TaskPrompt> {
        self.task_prompts.iter().find(|t| t.name == name)
    }
}

pub fn default_task_prompts() -> Vec<TaskPrompt> {
    DEFAULT_TASKS
        .iter()
        .map(|(name, prompt)| TaskPrompt::new(*name, *prompt))
        .collect()
}

/// Overlay saved prompts onto the built-in tasks.
///
/// The result always has exactly the built-in tasks in built-in order. A
/// saved prompt replaces the built-in one with the same name; saved entries
/// whose name is not built in are dropped.
pub fn merge_task_prompts(saved: &[TaskPrompt]) -> Vec<TaskPrompt> {
    default_task_prompts()
        .into_iter()
        .map(|default| {
            saved
                .iter()
                .find(|s| s.name == default.name)
                .cloned()
                .unwrap_or(default)
        })
        .collect()
}
