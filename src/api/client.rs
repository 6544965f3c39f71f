// Client for the API aggregator's completion and model listing endpoints
// Author: kelexine (https://github.com/kelexine)

use super::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::config::ApiConfig;
use crate::error::{AssistError, Result};
use crate::models::chat::{completion_content, error_message};
use crate::models::{ChatMessage, ChatRequest, ModelInfo, ModelListResponse};
use crate::settings::ApiKey;
use crate::utils::logging::sanitize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Client for the upstream chat completions API.
///
/// Each call is a single request: there are no retries, and every failure
/// is returned to the caller as a distinct `AssistError`.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    completions_url: String,
    models_url: String,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ApiConfig) -> Self {
        Self {
            transport,
            completions_url: config.completions_url(),
            models_url: config.models_url(),
        }
    }

    /// Client using the default reqwest transport.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Request a completion for `messages` and return its text.
    pub async fn complete(
        &self,
        api_key: &ApiKey,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let body = serde_json::to_string(&ChatRequest { model, messages })?;
        debug!(
            "Requesting completion: model={}, messages={}, body={} bytes",
            model,
            messages.len(),
            body.len()
        );

        let request = HttpRequest {
            method: Method::Post,
            url: self.completions_url.clone(),
            bearer: Some(api_key.clone()),
            body: Some(body),
        };

        let value = self.call("completions", request).await?;
        let content = completion_content(&value).ok_or_else(|| {
            error!("Completion response lacks choices[0].message.content");
            AssistError::UnexpectedResponseShape
        })?;

        info!("Received completion from {} ({} chars)", model, content.len());
        Ok(content.to_string())
    }

    /// Fetch the catalog of available models.
    pub async fn list_models(&self, api_key: Option<&ApiKey>) -> Result<Vec<ModelInfo>> {
        let request = HttpRequest {
            method: Method::Get,
            url: self.models_url.clone(),
            bearer: api_key.filter(|k| !k.is_empty()).cloned(),
            body: None,
        };

        let value = self.call("models", request).await?;
        let listing: ModelListResponse = serde_json::from_value(value).map_err(|e| {
            error!("Model listing has an unexpected shape: {}", e);
            AssistError::UnexpectedResponseShape
        })?;

        info!("Fetched {} models", listing.data.len());
        Ok(listing.data)
    }

    /// Send `request`, check the status and parse the JSON body.
    async fn call(&self, endpoint: &str, request: HttpRequest) -> Result<Value> {
        let start = Instant::now();
        let outcome = self.transport.send(request).await;
        let elapsed = start.elapsed().as_secs_f64();

        let HttpResponse { status, body } = match outcome {
            Ok(response) => response,
            Err(e) => {
                crate::metrics::record_api_call(endpoint, 0, elapsed);
                error!("{} request failed: {}", endpoint, sanitize(&e.to_string()));
                return Err(e);
            }
        };
        crate::metrics::record_api_call(endpoint, status, elapsed);

        if status != 200 {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(
                "{} API error: HTTP {} - {}",
                endpoint,
                status,
                sanitize(&message)
            );
            return Err(AssistError::Api { status, message });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                "{} response is not JSON: {} (first 200 chars: {})",
                endpoint,
                e,
                sanitize(&body.chars().take(200).collect::<String>())
            );
            AssistError::MalformedResponse(e.to_string())
        })
    }
}
