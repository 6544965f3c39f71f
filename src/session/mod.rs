//! Conversation transcript carried between a task and its follow-ups.
//!
//! A `Conversation` is created when the reader runs a task on a selection
//! and lives until the next task replaces it. It is never persisted.

// Author: kelexine (https://github.com/kelexine)

use crate::models::{ChatMessage, Role};

/// Compose the user message for running `prompt` on `selected_text`.
pub fn task_message(prompt: &str, selected_text: &str) -> String {
    format!("{}\n\nText: {}", prompt, selected_text)
}

/// Ordered, append-only message history of one reading session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    system_prompt: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// An empty conversation whose resets start with `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
        }
    }

    /// Change the system prompt used by subsequent resets.
    pub fn set_system_prompt(&mut self, system_prompt: impl Into<String>) {
        self.system_prompt = system_prompt.into();
    }

    /// Replace the transcript with the opening system and user turns of a task.
    pub fn reset(&mut self, selected_text: &str, prompt_text: &str) {
        self.messages.clear();
        self.messages.push(ChatMessage::system(self.system_prompt.clone()));
        self.messages
            .push(ChatMessage::user(task_message(prompt_text, selected_text)));
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Most recent assistant answer, if any.
    pub fn last_answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
