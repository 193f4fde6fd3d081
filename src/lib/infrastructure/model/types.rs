//! Model types - Request, Response, and Error types

use crate::types::{ChatMessage, ContentBlock, ToolDefinition};
use reqwest::StatusCode;
use thiserror::Error;

/// Model request for one Messages API call
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    /// `None` means the model may not request tools in its reply.
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Ordered content blocks returned by the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl ModelResponse {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            stop_reason: None,
        }
    }

    /// Text of the first block, if that block is text.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' rejected the API key ({status})")]
    AuthenticationFailed { provider: String, status: u16 },
    #[error("provider '{provider}' rate limited the request")]
    RateLimited { provider: String },
    #[error("provider '{provider}' returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ModelError {
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn from_status(provider: impl Into<String>, status: StatusCode, body: String) -> Self {
        let provider = provider.into();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::AuthenticationFailed {
                provider,
                status: status.as_u16(),
            },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { provider },
            _ => Self::Api {
                provider,
                status: status.as_u16(),
                message: body,
            },
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Short message suitable for the console
    pub fn user_message(&self) -> String {
        match self {
            ModelError::MissingApiKey { provider } => {
                format!("Provider '{provider}' needs an API key.")
            }
            ModelError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Could not connect to provider '{provider}'.")
                } else if source.is_timeout() {
                    format!("Request to '{provider}' timed out.")
                } else {
                    format!("Network error talking to '{provider}'.")
                }
            }
            ModelError::AuthenticationFailed { provider, .. } => {
                format!("Provider '{provider}' rejected the API key.")
            }
            ModelError::RateLimited { provider } => {
                format!("Provider '{provider}' is rate limiting requests; try again later.")
            }
            ModelError::Api {
                provider,
                status,
                message,
            } => match StatusCode::from_u16(*status) {
                Ok(StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY) => {
                    format!("Provider '{provider}' is currently unavailable.")
                }
                _ if message.trim().is_empty() => {
                    format!("Request to '{provider}' failed: {status}")
                }
                _ => format!("Request to '{provider}' failed: {status} {}", message.trim()),
            },
            ModelError::InvalidResponse { provider, .. } => {
                format!("Response from '{provider}' was not valid.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_text_only_looks_at_first_block() {
        let response = ModelResponse::new(vec![
            ContentBlock::tool_use("echo", json!({})),
            ContentBlock::text("later text"),
        ]);
        assert_eq!(response.first_text(), None);

        let response = ModelResponse::new(vec![ContentBlock::text("answer")]);
        assert_eq!(response.first_text(), Some("answer"));

        assert_eq!(ModelResponse::default().first_text(), None);
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(matches!(
            ModelError::from_status("anthropic", StatusCode::UNAUTHORIZED, String::new()),
            ModelError::AuthenticationFailed { status: 401, .. }
        ));
        assert!(matches!(
            ModelError::from_status("anthropic", StatusCode::TOO_MANY_REQUESTS, String::new()),
            ModelError::RateLimited { .. }
        ));
        let err = ModelError::from_status(
            "anthropic",
            StatusCode::BAD_REQUEST,
            "tools.0.input_schema: invalid".into(),
        );
        assert!(matches!(err, ModelError::Api { status: 400, .. }));
        assert!(err.user_message().contains("input_schema"));
    }
}
