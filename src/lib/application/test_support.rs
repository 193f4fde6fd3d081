//! In-process stand-ins for the model provider and the tool server.

use super::tooling::{ToolInvokeError, ToolServer};
use crate::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use crate::types::{ContentBlock, ToolCallResult, ToolDescriptor};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) enum ScriptedReply {
    Blocks(Vec<ContentBlock>),
    /// Fail with an API error carrying this HTTP status.
    Fail(u16),
}

impl ScriptedReply {
    pub(crate) fn blocks(blocks: Vec<ContentBlock>) -> Self {
        ScriptedReply::Blocks(blocks)
    }
}

/// Replays queued replies and records every request it receives.
#[derive(Clone)]
pub(crate) struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().await.push(request);
        match self.replies.lock().await.pop_front() {
            Some(ScriptedReply::Blocks(blocks)) => Ok(ModelResponse::new(blocks)),
            Some(ScriptedReply::Fail(status)) => Err(ModelError::Api {
                provider: "scripted".into(),
                status,
                message: "scripted failure".into(),
            }),
            None => Err(ModelError::invalid_response("scripted", "script exhausted")),
        }
    }
}

#[derive(Default)]
struct StubState {
    tools: Vec<ToolDescriptor>,
    results: HashMap<String, Value>,
    failing: HashSet<String>,
    connect_fails: bool,
    calls: Vec<(String, Value)>,
    lists: usize,
    closes: usize,
}

/// Tool server that answers from memory and counts what was asked of it.
#[derive(Clone, Default)]
pub(crate) struct StubToolServer {
    state: Arc<std::sync::Mutex<StubState>>,
}

impl StubToolServer {
    pub(crate) fn new(tools: Vec<ToolDescriptor>) -> Self {
        let server = Self::default();
        server.with_state(|state| state.tools = tools);
        server
    }

    pub(crate) fn with_result(self, tool: &str, content: Value) -> Self {
        self.with_state(|state| {
            state.results.insert(tool.to_string(), content);
        });
        self
    }

    pub(crate) fn failing_tool(self, tool: &str) -> Self {
        self.with_state(|state| {
            state.failing.insert(tool.to_string());
        });
        self
    }

    pub(crate) fn failing_connect(self) -> Self {
        self.with_state(|state| state.connect_fails = true);
        self
    }

    pub(crate) async fn calls(&self) -> Vec<(String, Value)> {
        self.with_state(|state| state.calls.clone())
    }

    pub(crate) async fn list_count(&self) -> usize {
        self.with_state(|state| state.lists)
    }

    pub(crate) async fn close_count(&self) -> usize {
        self.with_state(|state| state.closes)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StubState) -> R) -> R {
        let mut state = self.state.lock().expect("stub state lock poisoned");
        f(&mut state)
    }
}

#[async_trait]
impl ToolServer for StubToolServer {
    async fn connect(&self) -> Result<(), ToolInvokeError> {
        if self.with_state(|state| state.connect_fails) {
            return Err(ToolInvokeError::Spawn {
                server: "stub".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such server"),
            });
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        Ok(self.with_state(|state| {
            state.lists += 1;
            state.tools.clone()
        }))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, ToolInvokeError> {
        self.with_state(|state| {
            state.calls.push((name.to_string(), arguments));
            if state.failing.contains(name) {
                return Err(ToolInvokeError::ToolFailed {
                    server: "stub".into(),
                    tool: name.to_string(),
                    message: "stubbed failure".into(),
                });
            }
            let content = state
                .results
                .get(name)
                .cloned()
                .unwrap_or_else(|| json!([{ "type": "text", "text": format!("{name} ok") }]));
            Ok(ToolCallResult { content })
        })
    }

    async fn close(&self) {
        self.with_state(|state| state.closes += 1);
    }
}
