use thiserror::Error;

/// Failures talking to the MCP tool server.
#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("could not start '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{server}' is not connected")]
    NotConnected { server: String },
    #[error("lost connection to '{server}': {message}")]
    Transport { server: String, message: String },
    #[error("malformed message from '{server}': {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("'{server}' rejected the request ({code}): {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    /// The call completed but the result carried `isError: true`.
    #[error("tool '{tool}' failed: {message}")]
    ToolFailed {
        server: String,
        tool: String,
        message: String,
    },
    #[error("'{server}' exited unexpectedly")]
    Terminated { server: String },
    #[error("request to '{server}' was dropped before a reply arrived")]
    Cancelled { server: String },
}

impl ToolInvokeError {
    pub fn server(&self) -> &str {
        match self {
            ToolInvokeError::Spawn { server, .. }
            | ToolInvokeError::NotConnected { server }
            | ToolInvokeError::Transport { server, .. }
            | ToolInvokeError::InvalidJson { server, .. }
            | ToolInvokeError::Rpc { server, .. }
            | ToolInvokeError::ToolFailed { server, .. }
            | ToolInvokeError::Terminated { server }
            | ToolInvokeError::Cancelled { server } => server,
        }
    }
}
