// HTTP transport abstraction and its reqwest implementation
// Author: kelexine (https://github.com/kelexine)

use crate::config::ApiConfig;
use crate::error::{AssistError, Result};
use crate::settings::ApiKey;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request. `body` is sent as JSON.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<ApiKey>,
    pub body: Option<String>,
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request and waits for the complete response.
///
/// Implementations report failures to obtain any response (connection,
/// DNS, timeout, body read) as `AssistError::Network`. Every HTTP status,
/// including errors, is a successful exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// `Transport` over a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls();

        if config.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_seconds));
        }

        let client = builder
            .build()
            .map_err(|e| AssistError::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            "Created HTTP client (timeout: {}s)",
            config.timeout_seconds
        );
        Ok(Self { client })
    }
}

fn network_error(e: reqwest::Error) -> AssistError {
    if e.is_timeout() {
        AssistError::Network(format!("request timed out: {}", e))
    } else if e.is_connect() {
        AssistError::Network(format!("connection failed: {}", e))
    } else {
        AssistError::Network(e.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if let Some(key) = &request.bearer {
            builder = builder.header("Authorization", format!("Bearer {}", key.expose()));
        }
        if let Some(body) = request.body {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;

        Ok(HttpResponse { status, body })
    }
}
