use super::error::ToolInvokeError;
use super::interface::ToolServer;
use crate::config::ServerConfig;
use crate::rpc::{RpcRequest, RpcResponse};
use crate::types::{ToolCallResult, ToolDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2025-06-18";

type Responder = oneshot::Sender<Result<Value, ToolInvokeError>>;

/// MCP server child process spoken to over newline-delimited JSON-RPC on stdio.
#[derive(Clone)]
pub struct McpProcess {
    inner: Arc<McpProcessInner>,
}

struct McpProcessInner {
    server: ServerConfig,
    state: AsyncMutex<Option<RunningState>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<HashMap<String, Responder>>,
    id_counter: AtomicU64,
}

struct RunningState {
    child: Child,
}

impl McpProcess {
    pub fn new(server: ServerConfig) -> Self {
        Self {
            inner: Arc::new(McpProcessInner {
                server,
                state: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                pending: AsyncMutex::new(HashMap::new()),
                id_counter: AtomicU64::new(1),
            }),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.is_some()
    }
}

#[async_trait]
impl ToolServer for McpProcess {
    async fn connect(&self) -> Result<(), ToolInvokeError> {
        self.inner.ensure_running().await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        self.inner.list_tools().await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, ToolInvokeError> {
        self.inner.call_tool(name, arguments).await
    }

    async fn close(&self) {
        if self.inner.reset().await {
            info!(server = %self.inner.server.name, "Closed MCP server connection");
        }
    }
}

impl McpProcessInner {
    async fn ensure_running(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        {
            let state = self.state.lock().await;
            if state.is_some() {
                return Ok(());
            }
        }

        info!(
            server = %self.server.name,
            command = %self.server.command.display(),
            "Spawning MCP server"
        );

        let mut command = Command::new(&self.server.command);
        command
            .args(&self.server.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: self.server.name.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdout"))?;

        {
            let mut writer = self.writer.lock().await;
            *writer = Some(BufWriter::new(stdin));
        }

        {
            let mut state = self.state.lock().await;
            *state = Some(RunningState { child });
        }

        let reader_self = Arc::clone(self);
        tokio::spawn(async move {
            reader_self.reader_loop(stdout).await;
        });

        match self.initialize_sequence().await {
            Ok(_) => Ok(()),
            Err(err) => {
                self.reset().await;
                Err(err)
            }
        }
    }

    async fn initialize_sequence(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params).await?;
        let protocol = init_result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let server_info = init_result.get("serverInfo").cloned().unwrap_or(Value::Null);
        debug!(
            server = %self.server.name,
            protocol,
            %server_info,
            "MCP handshake completed"
        );
        self.send_notification("notifications/initialized", json!({}))
            .await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.send_request("tools/list", params).await?;
            let page: ToolListPage =
                serde_json::from_value(result).map_err(|source| ToolInvokeError::InvalidJson {
                    server: self.server.name.clone(),
                    source,
                })?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    warn!(
                        server = %self.server.name,
                        cursor = next.as_str(),
                        "MCP server repeated its tools/list cursor; stopping pagination"
                    );
                    break;
                }
                _ => break,
            }
        }
        debug!(server = %self.server.name, count = tools.len(), "Listed MCP tools");
        Ok(tools)
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        let response = self.send_request("tools/call", params).await?;
        let outcome: CallToolOutcome =
            serde_json::from_value(response).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.server.name.clone(),
                source,
            })?;

        if outcome.is_error {
            return Err(ToolInvokeError::ToolFailed {
                server: self.server.name.clone(),
                tool: tool.to_string(),
                message: error_text(&outcome.content),
            });
        }
        Ok(ToolCallResult {
            content: outcome.content,
        })
    }

    async fn reader_loop<R: AsyncRead + Unpin>(self: Arc<Self>, stdout: R) {
        let mut reader = BufReader::new(stdout);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => self.handle_inbound_line(&line).await,
                Err(err) => {
                    warn!(server = %self.server.name, %err, "failed to read from MCP server");
                    break;
                }
            }
        }

        if self.reset().await {
            warn!(server = %self.server.name, "MCP server closed its output stream");
        }
    }

    /// Undecodable lines are logged and skipped; the connection stays up.
    async fn handle_inbound_line(&self, raw: &[u8]) {
        let trimmed = raw.trim_ascii();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.starts_with(b"\x1b") {
            debug!(
                server = %self.server.name,
                line = %String::from_utf8_lossy(trimmed),
                "skipping non-JSON ANSI log line from MCP server"
            );
            return;
        }
        match serde_json::from_slice::<Value>(trimmed) {
            Ok(value) => {
                if let Err(err) = self.process_inbound_message(value).await {
                    warn!(
                        server = %self.server.name,
                        %err,
                        "failed to process message from MCP server"
                    );
                }
            }
            Err(source) => {
                warn!(
                    server = %self.server.name,
                    line = %String::from_utf8_lossy(trimmed),
                    %source,
                    "received invalid JSON from MCP server"
                );
            }
        }
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        if let Some(id) = value.get("id").cloned() {
            if value.get("method").is_some() {
                self.handle_server_request(id, value).await
            } else {
                self.handle_response(id, value).await
            }
        } else if value.get("method").is_some() {
            self.handle_notification(value);
            Ok(())
        } else {
            Ok(())
        }
    }

    async fn handle_response(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let Some(key) = response_key(&id) else {
            return Ok(());
        };

        let responder = {
            let mut pending = self.pending.lock().await;
            pending.remove(&key)
        };

        let Some(sender) = responder else {
            debug!(
                server = %self.server.name,
                response_id = key,
                "received response for unknown request"
            );
            return Ok(());
        };

        let outcome = match serde_json::from_value::<RpcResponse>(value) {
            Ok(RpcResponse {
                error: Some(error), ..
            }) => Err(ToolInvokeError::Rpc {
                server: self.server.name.clone(),
                code: error.code,
                message: error.message,
            }),
            Ok(response) => Ok(response.result.unwrap_or(Value::Null)),
            Err(source) => Err(ToolInvokeError::InvalidJson {
                server: self.server.name.clone(),
                source,
            }),
        };
        let _ = sender.send(outcome);
        Ok(())
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match method {
            "ping" => {
                self.write_message(&RpcResponse::success(Some(id), json!({})))
                    .await
            }
            other => {
                warn!(
                    server = %self.server.name,
                    method = other,
                    "server sent unsupported request"
                );
                self.write_message(&RpcResponse::method_not_found(Some(id), other))
                    .await
            }
        }
    }

    fn handle_notification(&self, value: Value) {
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return;
        };
        if method == "notifications/tools/list_changed" {
            info!(
                server = %self.server.name,
                "MCP server changed its tool list; keeping the catalogue loaded at connect"
            );
        } else {
            debug!(
                server = %self.server.name,
                method,
                "received notification from server"
            );
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id.clone(), tx);
        }

        debug!(server = %self.server.name, method, request_id = id.as_str(), "Sending MCP request");
        let request = RpcRequest::new(id.clone(), method, params);
        if let Err(err) = self.write_message(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolInvokeError::Cancelled {
                server: self.server.name.clone(),
            }),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        self.write_message(&RpcRequest::notification(method, params))
            .await
    }

    async fn write_message<T: Serialize + Sync>(&self, message: &T) -> Result<(), ToolInvokeError> {
        let encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.server.name.clone(),
                source,
            })?;

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| ToolInvokeError::NotConnected {
                server: self.server.name.clone(),
            })?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .write_all(b"\n")
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        Ok(())
    }

    /// Tear down the child process and fail outstanding requests.
    ///
    /// Returns whether a process was running.
    async fn reset(&self) -> bool {
        {
            let mut writer = self.writer.lock().await;
            *writer = None;
        }

        let running = self.state.lock().await.take();
        let was_running = running.is_some();
        if let Some(mut running) = running {
            if let Err(err) = running.child.kill().await {
                debug!(
                    server = %self.server.name,
                    %err,
                    "failed to kill MCP server process (may have already exited)"
                );
            }
        }

        self.fail_all_pending().await;
        was_running
    }

    async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolInvokeError::Terminated {
                server: self.server.name.clone(),
            }));
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.server.name.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

/// Text blocks of an error result, or the raw content when it has none.
fn error_text(content: &Value) -> String {
    let texts: Vec<&str> = content
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if texts.is_empty() {
        content.to_string()
    } else {
        texts.join(" ")
    }
}

#[derive(Debug, Deserialize)]
struct ToolListPage {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolOutcome {
    #[serde(default)]
    content: Value,
    #[serde(rename = "isError", default)]
    is_error: bool,
}
