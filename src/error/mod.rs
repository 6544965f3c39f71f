// Error types for marginalia
// Author: kelexine (https://github.com/kelexine)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Settings have not been loaded")]
    SettingsNotInitialized,

    #[error("No API key configured")]
    MissingApiKey,

    #[error("No model selected")]
    MissingModel,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: missing choices[0].message.content")]
    UnexpectedResponseShape,

    #[error("Conversation has no messages")]
    EmptyConversation,

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Settings storage error: {0}")]
    Settings(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),
}

impl AssistError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AssistError::SettingsNotInitialized => "settings_not_initialized",
            AssistError::MissingApiKey => "missing_api_key",
            AssistError::MissingModel => "missing_model",
            AssistError::Network(_) => "network_error",
            AssistError::MalformedResponse(_) => "malformed_response",
            AssistError::Api { .. } => "api_error",
            AssistError::UnexpectedResponseShape => "unexpected_response_shape",
            AssistError::EmptyConversation => "empty_conversation",
            AssistError::UnknownTask(_) => "unknown_task",
            AssistError::Settings(_) => "settings_error",
            AssistError::Config(_) | AssistError::ConfigParsing(_) => "configuration_error",
            AssistError::Io(_) => "io_error",
            AssistError::Json(_) => "json_error",
        }
    }

    /// Whether this is a query outcome the reader should see, as opposed
    /// to an infrastructure failure.
    pub fn is_query_failure(&self) -> bool {
        !matches!(
            self,
            AssistError::Settings(_)
                | AssistError::Config(_)
                | AssistError::ConfigParsing(_)
                | AssistError::Io(_)
                | AssistError::Json(_)
        )
    }

    /// Short message suitable for showing to the reader in a popup.
    pub fn user_message(&self) -> String {
        match self {
            AssistError::SettingsNotInitialized => {
                "Settings are not available yet. Please reopen the assistant.".to_string()
            }
            AssistError::MissingApiKey => "Please set your API key in the settings.".to_string(),
            AssistError::MissingModel => "Please select a model in the settings.".to_string(),
            AssistError::Network(_) => {
                "Could not reach the API. Check your network connection.".to_string()
            }
            AssistError::MalformedResponse(_) => {
                "The API returned a response that could not be read.".to_string()
            }
            AssistError::Api { message, .. } => format!("API error: {}", message),
            AssistError::UnexpectedResponseShape => {
                "The API response did not contain an answer.".to_string()
            }
            AssistError::EmptyConversation => "There is nothing to ask yet.".to_string(),
            AssistError::UnknownTask(name) => format!("Unknown task: {}", name),
            _ => format!("Internal error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_failures_are_separated_from_infrastructure() {
        for err in [
            AssistError::SettingsNotInitialized,
            AssistError::MalformedResponse("eof".to_string()),
            AssistError::UnexpectedResponseShape,
            AssistError::EmptyConversation,
            AssistError::Network("refused".to_string()),
        ] {
            assert!(err.is_query_failure(), "{:?}", err);
        }
        assert!(!AssistError::Settings("disk full".to_string()).is_query_failure());
        assert!(!AssistError::Config("bad".to_string()).is_query_failure());
    }

    #[test]
    fn test_api_error_user_message_carries_server_text() {
        let err = AssistError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.user_message(), "API error: rate limited");
        assert_eq!(err.kind(), "api_error");
    }

    #[test]
    fn test_precondition_kinds_are_distinct() {
        assert_ne!(
            AssistError::MissingApiKey.kind(),
            AssistError::MissingModel.kind()
        );
        assert_ne!(
            AssistError::MissingApiKey.user_message(),
            AssistError::MissingModel.user_message()
        );
    }
}
