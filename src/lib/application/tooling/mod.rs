mod error;
mod interface;
mod process;

pub use error::ToolInvokeError;
pub use interface::ToolServer;
pub use process::McpProcess;
