use super::catalog;
use super::tooling::{ToolInvokeError, ToolServer};
use crate::config::AppConfig;
use crate::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use crate::types::{ChatMessage, ContentBlock, ToolCallResult, ToolDefinition};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What happens after a tool result has been appended to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowUpPolicy {
    /// One follow-up per tool use, sent without tools; only the first block
    /// of its reply is used, and only if it is text.
    #[default]
    FirstBlockOnly,
    /// Keep answering tool uses until the model replies without one, for at
    /// most `max_rounds` follow-ups. The last permitted follow-up is sent
    /// without tools and tool uses in its reply are not executed.
    UntilNoToolUse { max_rounds: usize },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub model: String,
    pub max_tokens: u32,
    pub follow_up: FollowUpPolicy,
}

impl ClientConfig {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            follow_up: FollowUpPolicy::default(),
        }
    }

    pub fn with_follow_up(mut self, policy: FollowUpPolicy) -> Self {
        self.follow_up = policy;
        self
    }
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.model.clone(), config.max_tokens)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("MCP connection failed: {0}")]
    Connection(#[source] ToolInvokeError),
    #[error("tool call failed: {0}")]
    Tool(#[source] ToolInvokeError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ClientError {
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Connection(err) | ClientError::Tool(err) => err.to_string(),
            ClientError::Model(err) => err.user_message(),
        }
    }
}

/// One model provider, one tool-server connection, and the tool catalogue
/// loaded when that connection was made.
pub struct McpClient<P, T> {
    provider: P,
    tools: T,
    config: ClientConfig,
    catalog: Vec<ToolDefinition>,
}

impl<P: ModelProvider, T: ToolServer> McpClient<P, T> {
    pub fn new(provider: P, tools: T, config: ClientConfig) -> Self {
        Self {
            provider,
            tools,
            config,
            catalog: Vec::new(),
        }
    }

    /// Tool definitions advertised to the model for this connection.
    pub fn catalog(&self) -> &[ToolDefinition] {
        &self.catalog
    }

    /// Connect to the tool server and cache its catalogue.
    pub async fn connect(&mut self) -> Result<&[ToolDefinition], ClientError> {
        self.tools.connect().await.map_err(ClientError::Connection)?;
        let descriptors = self
            .tools
            .list_tools()
            .await
            .map_err(ClientError::Connection)?;
        self.catalog = catalog::adapt(&descriptors);
        info!(
            provider = self.provider.id(),
            tools = self.catalog.len(),
            "Connected to MCP server"
        );
        Ok(&self.catalog)
    }

    pub async fn close(&self) {
        self.tools.close().await;
    }

    /// Run one query to completion and return the text to display.
    ///
    /// Every query starts from a fresh history holding only `query`.
    pub async fn process_query(&self, query: &str) -> Result<String, ClientError> {
        let mut messages = vec![ChatMessage::user(query)];
        let mut output = Vec::new();

        debug!(
            model = self.config.model.as_str(),
            query = %summarise(query),
            "Processing query"
        );
        let response = self.request(&messages, true).await?;

        match self.config.follow_up {
            FollowUpPolicy::FirstBlockOnly => {
                self.first_block_only(response, &mut messages, &mut output)
                    .await?
            }
            FollowUpPolicy::UntilNoToolUse { max_rounds } => {
                self.until_no_tool_use(response, max_rounds, &mut messages, &mut output)
                    .await?
            }
        }

        debug!(
            messages = messages.len(),
            fragments = output.len(),
            "Query complete"
        );
        Ok(output.join("\n"))
    }

    async fn first_block_only(
        &self,
        response: ModelResponse,
        messages: &mut Vec<ChatMessage>,
        output: &mut Vec<String>,
    ) -> Result<(), ClientError> {
        for block in response.content {
            match block {
                ContentBlock::Text { text } => output.push(text),
                ContentBlock::ToolUse { name, input, .. } => {
                    let result = self.invoke(&name, input, output).await?;
                    messages.push(ChatMessage::tool_result(result.content));

                    let follow_up = self.request(messages, false).await?;
                    if let Some(text) = follow_up.first_text() {
                        output.push(text.to_string());
                    }
                }
                ContentBlock::Other => {}
            }
        }
        Ok(())
    }

    async fn until_no_tool_use(
        &self,
        first: ModelResponse,
        max_rounds: usize,
        messages: &mut Vec<ChatMessage>,
        output: &mut Vec<String>,
    ) -> Result<(), ClientError> {
        let mut response = first;
        let mut rounds = 0;
        let mut offered_tools = true;
        loop {
            let mut texts = Vec::new();
            let mut results = Vec::new();
            for block in response.content {
                match block {
                    ContentBlock::Text { text } => {
                        output.push(text.clone());
                        texts.push(text);
                    }
                    ContentBlock::ToolUse { name, input, .. } if offered_tools => {
                        let result = self.invoke(&name, input, output).await?;
                        results.push(ChatMessage::tool_result(result.content));
                    }
                    ContentBlock::ToolUse { name, .. } => {
                        debug!(tool = name.as_str(), "Ignoring tool use after the last round");
                    }
                    ContentBlock::Other => {}
                }
            }

            let used_tools = !results.is_empty();
            if !texts.is_empty() {
                messages.push(ChatMessage::assistant(texts.join("\n")));
            }
            messages.extend(results);

            if !used_tools || rounds >= max_rounds {
                return Ok(());
            }
            rounds += 1;
            offered_tools = rounds < max_rounds;
            response = self.request(messages, offered_tools).await?;
        }
    }

    async fn invoke(
        &self,
        name: &str,
        input: Value,
        output: &mut Vec<String>,
    ) -> Result<ToolCallResult, ClientError> {
        output.push(format!("[Calling tool {name} with args {input}]"));
        info!(tool = name, "Calling tool");
        self.tools.call_tool(name, input).await.map_err(|err| {
            warn!(server = err.server(), tool = name, %err, "Tool call failed");
            ClientError::Tool(err)
        })
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        with_tools: bool,
    ) -> Result<ModelResponse, ClientError> {
        let request = ModelRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: messages.to_vec(),
            tools: with_tools.then(|| self.catalog.clone()),
        };
        Ok(self.provider.chat(request).await?)
    }
}

pub(crate) fn summarise(text: &str) -> String {
    const SNIPPET_LIMIT: usize = 160;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "(empty)".to_string();
    }
    let single_line = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut result = String::new();
    let mut chars = single_line.chars();
    for _ in 0..SNIPPET_LIMIT {
        if let Some(ch) = chars.next() {
            result.push(ch);
        } else {
            return result;
        }
    }
    if chars.next().is_some() {
        result.push('…');
    }
    result
}
