//! Query engine.
//!
//! Turns a selection plus a task, or a whole conversation, into a model
//! answer. Answers are looked up in the response cache first. On a miss
//! the engine checks that an API key and a model are configured, sends one
//! completion request and caches the answer.
//!
//! Only one completion request is in flight at a time. A query that misses
//! the cache waits for the request before it, then looks in the cache
//! again before going to the network, so a repeated query that was queued
//! behind the original is answered from the cache.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::api::ApiClient;
use crate::cache::{fingerprint, history_fingerprint, ResponseCache};
use crate::error::{AssistError, Result};
use crate::models::{ChatMessage, ModelInfo};
use crate::session::{task_message, Conversation};
use crate::settings::{ApiKey, SettingsStore, TaskPrompt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct QueryEngine {
    client: ApiClient,
    settings: Arc<SettingsStore>,
    cache: Arc<ResponseCache>,
    /// Serializes network calls.
    in_flight: Mutex<()>,
}

impl QueryEngine {
    pub fn new(client: ApiClient, settings: Arc<SettingsStore>, cache: Arc<ResponseCache>) -> Self {
        Self {
            client,
            settings,
            cache,
            in_flight: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Cache key of a single-shot query. Tasks are identified by their prompt
    /// text, so editing a task's prompt stops it from reusing old answers.
    fn single_key(text: &str, task: &TaskPrompt) -> String {
        fingerprint(text, &task.prompt)
    }

    /// Cached answer for `text` under `task`, without touching statistics or
    /// the network.
    pub fn cached_single(&self, text: &str, task: &TaskPrompt) -> Option<String> {
        self.cache
            .peek(&Self::single_key(text, task))
            .map(|entry| entry.response)
    }

    /// Run `task` on `text` and return the answer.
    pub async fn query_single(&self, text: &str, task: &TaskPrompt) -> Result<String> {
        let key = Self::single_key(text, task);

        if let Some(entry) = self.cache.get(&key) {
            debug!("Answering task '{}' from cache", task.name);
            return Ok(entry.response);
        }

        let result = async {
            let (api_key, model, system_prompt) = self.credentials()?;
            let messages = vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(task_message(&task.prompt, text)),
            ];
            self.fetch(&key, &api_key, &model, &messages).await
        }
        .await;

        Self::observe(result)
    }

    /// Run the whole transcript `messages` and return the answer.
    ///
    /// The cache key is built from the last message alone: conversations
    /// ending in the same message share one cached answer regardless of
    /// their earlier turns.
    pub async fn query_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        let Some(last) = messages.last() else {
            return Self::observe(Err(AssistError::EmptyConversation));
        };
        let key = history_fingerprint(&last.content);

        if let Some(entry) = self.cache.get(&key) {
            debug!("Answering follow-up from cache");
            return Ok(entry.response);
        }

        let result = async {
            let (api_key, model, _) = self.credentials()?;
            self.fetch(&key, &api_key, &model, messages).await
        }
        .await;

        Self::observe(result)
    }

    /// Resolve the task called `task_name` and run it on `text`.
    pub async fn run_task(&self, text: &str, task_name: &str) -> Result<String> {
        let task = self
            .settings
            .task_prompt(task_name)?
            .ok_or_else(|| AssistError::UnknownTask(task_name.to_string()))?;
        self.query_single(text, &task).await
    }

    /// Start a new conversation for `task` on `text`.
    ///
    /// The conversation is reset to the task's opening turns before the
    /// query; the answer is appended only on success.
    pub async fn start_task(
        &self,
        conversation: &mut Conversation,
        text: &str,
        task: &TaskPrompt,
    ) -> Result<String> {
        conversation.set_system_prompt(self.settings.system_prompt()?);
        conversation.reset(text, &task.prompt);

        let answer = self.query_single(text, task).await?;
        conversation.append_assistant(answer.clone());
        Ok(answer)
    }

    /// Ask `question` in the context of `conversation`.
    ///
    /// The question is appended before the query and stays in the
    /// transcript if the query fails.
    pub async fn follow_up(&self, conversation: &mut Conversation, question: &str) -> Result<String> {
        conversation.append_user(question);

        let answer = self.query_with_history(conversation.messages()).await?;
        conversation.append_assistant(answer.clone());
        Ok(answer)
    }

    /// Fetch the model catalog and store it in the settings.
    pub async fn refresh_models(&self) -> Result<Vec<ModelInfo>> {
        let api_key = self.settings.api_key()?;
        let _guard = self.in_flight.lock().await;

        let models = self.client.list_models(Some(&api_key)).await?;
        self.settings.set_models(models.clone())?;
        Ok(models)
    }

    /// Settings needed to build a request, failing fast on the first one
    /// missing.
    fn credentials(&self) -> Result<(ApiKey, String, String)> {
        let settings = self.settings.snapshot()?;

        if settings.api_key.is_empty() {
            return Err(AssistError::MissingApiKey);
        }
        if settings.selected_model.trim().is_empty() {
            return Err(AssistError::MissingModel);
        }

        Ok((
            settings.api_key.clone(),
            settings.selected_model.clone(),
            settings.system_prompt.clone(),
        ))
    }

    /// Send the request under the in-flight guard and cache the answer.
    async fn fetch(
        &self,
        key: &str,
        api_key: &ApiKey,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let _guard = self.in_flight.lock().await;

        // Re-check after waiting: a queued duplicate may have been answered.
        if let Some(entry) = self.cache.peek(key) {
            debug!("Answered while waiting for the previous request");
            return Ok(entry.response);
        }

        let answer = self.client.complete(api_key, model, messages).await?;
        self.cache.put(key, &answer);

        info!("Query answered by {} ({} chars)", model, answer.len());
        Ok(answer)
    }

    fn observe(result: Result<String>) -> Result<String> {
        if let Err(e) = &result {
            warn!("Query failed ({}): {}", e.kind(), e);
            crate::metrics::record_query_error(e.kind());
        }
        result
    }
}
