pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{catalog, client, stdio, tooling};
pub use cli::Cli;
pub use config::{AppConfig, ServerConfig};
pub use domain::types;
pub use infrastructure::{model, rpc};

use client::{ClientConfig, McpClient};
use model::AnthropicClient;
use std::error::Error;
use stdio::QueryErrorPolicy;
use tokio::io::{self, BufReader};
use tooling::McpProcess;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let Some(server) = cli.server.as_deref() else {
        println!("{}", cli::usage());
        return Ok(());
    };

    init_tracing();
    info!("Starting mcp-chat");
    debug!(server, args = ?cli.server_args, "CLI arguments parsed");

    let config = AppConfig::load()?;
    debug!(?config, "Loaded provider configuration");

    let server_config = ServerConfig::from_command(server, cli.server_args.clone());
    info!(
        server = server_config.name.as_str(),
        command = %server_config.command.display(),
        "Using MCP server"
    );

    let provider = AnthropicClient::from_config(&config);
    let tools = McpProcess::new(server_config);
    let client = McpClient::new(provider, tools, ClientConfig::from(&config));

    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    stdio::run(client, stdin, &mut stdout, QueryErrorPolicy::default()).await?;

    info!("Client execution finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
