use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Message body as sent to the model.
///
/// Tool results are kept as the raw `content` value returned by the tool
/// server and serialized verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    ToolResult(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: MessageContent) -> Self {
        Self { role, content }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, MessageContent::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, MessageContent::Text(text.into()))
    }

    /// Tool output goes back to the model on the user side of the conversation.
    pub fn tool_result(content: Value) -> Self {
        Self::new(MessageRole::User, MessageContent::ToolResult(content))
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self.content, MessageContent::ToolResult(_))
    }
}

/// One unit of a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    /// Block kinds this client does not act on (thinking, server tools, ...).
    #[serde(other)]
    Other,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use(name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolUse {
            id: String::new(),
            name: name.into(),
            input,
        }
    }
}

/// Tool as advertised by the MCP server in `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Successful `tools/call` result; `content` is opaque to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub content: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_result_message_serializes_content_verbatim() {
        let content = json!([{ "type": "text", "text": "42" }]);
        let message = ChatMessage::tool_result(content.clone());

        let encoded = serde_json::to_value(&message).expect("serializes");
        assert_eq!(encoded, json!({ "role": "user", "content": content }));
    }

    #[test]
    fn text_message_serializes_as_plain_string() {
        let encoded = serde_json::to_value(ChatMessage::user("hello")).expect("serializes");
        assert_eq!(encoded, json!({ "role": "user", "content": "hello" }));
    }

    #[test]
    fn unknown_block_kinds_decode_as_other() {
        let blocks: Vec<ContentBlock> = serde_json::from_value(json!([
            { "type": "thinking", "thinking": "hmm", "signature": "abc" },
            { "type": "text", "text": "hi" },
            { "type": "tool_use", "id": "toolu_1", "name": "echo", "input": { "text": "x" } }
        ]))
        .expect("decodes");

        assert_eq!(blocks[0], ContentBlock::Other);
        assert_eq!(blocks[1], ContentBlock::text("hi"));
        assert_eq!(
            blocks[2],
            ContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "echo".into(),
                input: json!({ "text": "x" }),
            }
        );
    }

    #[test]
    fn descriptor_tolerates_missing_description() {
        let descriptor: ToolDescriptor = serde_json::from_value(json!({
            "name": "ping",
            "inputSchema": { "type": "object" }
        }))
        .expect("decodes");

        assert_eq!(descriptor.description, None);
        assert_eq!(descriptor.input_schema, json!({ "type": "object" }));
    }
}
