//! Anthropic Messages API client
//!
//! Non-streaming `POST /v1/messages` with `x-api-key` authentication. Tool
//! definitions go in the top-level `tools` field and `tool_use` blocks come
//! back in `content`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::AppConfig;
use crate::infrastructure::model::traits::ModelProvider;
use crate::infrastructure::model::types::{ModelError, ModelRequest, ModelResponse};
use crate::types::{ChatMessage, ContentBlock, ToolDefinition};

const PROVIDER_ID: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";

#[derive(Clone)]
pub struct AnthropicClient {
    base: HttpClientBase,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            base: HttpClientBase::new(
                PROVIDER_ID.to_string(),
                endpoint.into(),
                Some(api_key.into()),
            ),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_key.clone(), config.endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.base.endpoint
    }
}

#[async_trait]
impl ModelProvider for AnthropicClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.base.build_url(MESSAGES_PATH);
        let payload = MessagesRequest::from_request(&request);

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = payload.tools.map(|tools| tools.len()).unwrap_or(0),
            "Sending request to Anthropic"
        );

        let response: MessagesResponse = self
            .base
            .post_with_key_header(
                &url,
                "x-api-key",
                &[("anthropic-version", ANTHROPIC_VERSION)],
                &payload,
            )
            .await?;

        if let Some(usage) = &response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = ?response.stop_reason,
                "Received response from Anthropic"
            );
        }

        Ok(ModelResponse {
            content: response.content,
            stop_reason: response.stop_reason,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

impl<'a> MessagesRequest<'a> {
    fn from_request(request: &'a ModelRequest) -> Self {
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: &request.messages,
            tools: request
                .tools
                .as_deref()
                .filter(|tools| !tools.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(tools: Option<Vec<ToolDefinition>>) -> ModelRequest {
        ModelRequest {
            model: "claude-test".into(),
            max_tokens: 1000,
            messages: vec![
                ChatMessage::user("what is 2+2?"),
                ChatMessage::tool_result(json!([{ "type": "text", "text": "4" }])),
            ],
            tools,
        }
    }

    #[test]
    fn payload_includes_tools_and_raw_tool_results() {
        let tools = vec![ToolDefinition {
            name: "add".into(),
            description: Some("Add numbers".into()),
            input_schema: json!({ "type": "object" }),
        }];
        let request = request(Some(tools));

        let encoded = serde_json::to_value(MessagesRequest::from_request(&request))
            .expect("serializes");

        assert_eq!(
            encoded,
            json!({
                "model": "claude-test",
                "max_tokens": 1000,
                "messages": [
                    { "role": "user", "content": "what is 2+2?" },
                    { "role": "user", "content": [{ "type": "text", "text": "4" }] }
                ],
                "tools": [{
                    "name": "add",
                    "description": "Add numbers",
                    "input_schema": { "type": "object" }
                }]
            })
        );
    }

    #[test]
    fn payload_omits_tools_for_follow_up_requests() {
        let without_tools = request(None);
        let encoded = serde_json::to_value(MessagesRequest::from_request(&without_tools))
            .expect("serializes");
        assert!(encoded.get("tools").is_none());

        let empty_catalog = request(Some(Vec::new()));
        let encoded = serde_json::to_value(MessagesRequest::from_request(&empty_catalog))
            .expect("serializes");
        assert!(encoded.get("tools").is_none());
    }

    #[test]
    fn decodes_mixed_content_response() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-test",
            "content": [
                { "type": "text", "text": "Let me add those." },
                { "type": "tool_use", "id": "toolu_01", "name": "add", "input": { "a": 2, "b": 2 } }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 12, "output_tokens": 30 }
        }))
        .expect("decodes");

        assert_eq!(response.content.len(), 2);
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
        assert!(matches!(
            &response.content[1],
            ContentBlock::ToolUse { name, input, .. } if name == "add" && input == &json!({ "a": 2, "b": 2 })
        ));
    }

    #[test]
    fn endpoint_is_kept_from_config() {
        let config = AppConfig {
            api_key: "sk-ant-test".into(),
            model: "claude-test".into(),
            max_tokens: 1000,
            endpoint: "http://localhost:9000".into(),
        };
        let client = AnthropicClient::from_config(&config);
        assert_eq!(client.endpoint(), "http://localhost:9000");
        assert_eq!(client.id(), "anthropic");
    }

    #[tokio::test]
    async fn blank_api_key_fails_before_any_network_call() {
        let client = AnthropicClient::new("   ", "http://127.0.0.1:9");
        let err = client.chat(request(None)).await.expect_err("missing key");
        assert!(matches!(err, ModelError::MissingApiKey { .. }));
    }
}
