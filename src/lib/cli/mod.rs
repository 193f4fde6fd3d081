use clap::Parser;

pub const BIN_NAME: &str = "mcp-chat";

#[derive(Parser, Debug)]
#[command(
    name = "mcp-chat",
    version,
    about = "Chat with an Anthropic model that can call tools on an MCP server"
)]
pub struct Cli {
    /// Command or script that starts the MCP server over stdio
    pub server: Option<String>,
    /// Extra arguments passed through to the server process
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub server_args: Vec<String>,
}

pub fn usage() -> String {
    format!("Usage: {BIN_NAME} <path_to_server_script>")
}
