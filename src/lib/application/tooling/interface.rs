use async_trait::async_trait;
use serde_json::Value;

use super::error::ToolInvokeError;
use crate::types::{ToolCallResult, ToolDescriptor};

/// A single tool-server connection.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Establish the connection (spawn + handshake). Idempotent once connected.
    async fn connect(&self) -> Result<(), ToolInvokeError>;

    /// Tool catalogue in the order the server lists it.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, ToolInvokeError>;

    /// Release the connection. Safe to call when never connected.
    async fn close(&self);
}
