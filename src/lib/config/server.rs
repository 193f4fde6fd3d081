use std::path::{Path, PathBuf};

/// How to launch the MCP server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
}

impl ServerConfig {
    /// Build a server config from a command line, expanding `~` and `$VAR`.
    pub fn from_command(command: &str, args: Vec<String>) -> Self {
        let command = PathBuf::from(expand(command));
        let args = args.iter().map(|arg| expand(arg)).collect();
        let name = server_name(&command);
        Self {
            name,
            command,
            args,
        }
    }
}

fn expand(raw: &str) -> String {
    shellexpand::full(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn server_name(command: &Path) -> String {
    command
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| command.display().to_string())
}
