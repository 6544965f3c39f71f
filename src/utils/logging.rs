//! Structured logging and secret-scrubbing utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing a helper to keep API
//! keys out of log output.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for machine ingestion.
/// - `compact`: Single-line human-readable output.
/// - `pretty` (default): Multi-line, colorized output for development.
///
/// Logs go to stderr so command output on stdout stays clean. Log levels are
/// controlled via the `RUST_LOG` environment variable or the provided
/// `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

/// Replaces API keys and bearer tokens in `input` with placeholders.
///
/// Recognized patterns:
/// - `sk-...` keys (OpenRouter `sk-or-...`, OpenAI `sk-...`)
/// - the credential following `Bearer `
pub fn sanitize(input: &str) -> String {
    let mut result = redact_after(input, "Bearer ", "[REDACTED_TOKEN]", true);
    result = redact_after(&result, "sk-", "[REDACTED_API_KEY]", false);
    result
}

/// Redacts every token starting at `marker`. When `keep_marker` is set the
/// marker itself stays and only the following token is replaced.
fn redact_after(input: &str, marker: &str, placeholder: &str, keep_marker: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(marker) {
        let token_start = pos + marker.len();
        let token_len = rest[token_start..]
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ',')
            .unwrap_or(rest.len() - token_start);

        let inside_word = rest[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric());

        if inside_word || token_len == 0 || rest[token_start..].starts_with('[') {
            // Part of an ordinary word, nothing to hide, or already redacted
            out.push_str(&rest[..token_start]);
            rest = &rest[token_start..];
            continue;
        }

        out.push_str(&rest[..pos]);
        if keep_marker {
            out.push_str(marker);
        }
        out.push_str(placeholder);
        rest = &rest[token_start + token_len..];
    }

    out.push_str(rest);
    out
}
