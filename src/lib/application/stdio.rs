use super::client::{ClientError, McpClient};
use super::tooling::ToolServer;
use crate::model::ModelProvider;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What a failed query does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryErrorPolicy {
    /// Report the failure and end the session.
    #[default]
    Abort,
    /// Report the failure and prompt for the next query.
    Continue,
}

enum LoopControl {
    Continue,
    Exit,
}

/// Connect, run the read-query-print loop, then close the tool server.
///
/// The tool server is closed exactly once on every path out of here,
/// including a failed connection and an aborted query.
pub async fn run<P, T, R, W>(
    mut client: McpClient<P, T>,
    input: R,
    output: &mut W,
    on_error: QueryErrorPolicy,
) -> Result<(), StdioError>
where
    P: ModelProvider,
    T: ToolServer,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let outcome = drive(&mut client, input, output, on_error).await;

    client.close().await;
    info!("Tool server closed");

    let flushed = output.flush().await;
    outcome?;
    flushed?;
    Ok(())
}

async fn drive<P, T, R, W>(
    client: &mut McpClient<P, T>,
    input: R,
    output: &mut W,
    on_error: QueryErrorPolicy,
) -> Result<(), StdioError>
where
    P: ModelProvider,
    T: ToolServer,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    connect(client, output).await?;
    print_banner(output).await?;

    let mut lines = input.lines();
    loop {
        prompt(output).await?;
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => {
                write_line(output, "").await?;
                debug!("Input closed");
                break;
            }
        };

        match handle_line(client, &line, output, on_error).await? {
            LoopControl::Continue => continue,
            LoopControl::Exit => break,
        }
    }
    Ok(())
}

async fn connect<P, T, W>(client: &mut McpClient<P, T>, output: &mut W) -> Result<(), StdioError>
where
    P: ModelProvider,
    T: ToolServer,
    W: AsyncWrite + Unpin,
{
    match client.connect().await {
        Ok(catalog) => {
            let names: Vec<&str> = catalog.iter().map(|tool| tool.name.as_str()).collect();
            write_line(output, &format!("Connected to server with tools: {names:?}")).await?;
            Ok(())
        }
        Err(err) => {
            error!(%err, "Failed to connect to MCP server");
            write_line(
                output,
                &format!("Failed to connect to MCP server: {}", err.user_message()),
            )
            .await?;
            Err(err.into())
        }
    }
}

async fn handle_line<P, T, W>(
    client: &McpClient<P, T>,
    line: &str,
    output: &mut W,
    on_error: QueryErrorPolicy,
) -> Result<LoopControl, StdioError>
where
    P: ModelProvider,
    T: ToolServer,
    W: AsyncWrite + Unpin,
{
    if is_quit(line) {
        return Ok(LoopControl::Exit);
    }

    match client.process_query(line).await {
        Ok(response) => {
            write_line(output, &format!("\n{response}")).await?;
            Ok(LoopControl::Continue)
        }
        Err(err) => {
            error!(%err, "Query failed");
            write_line(output, &format!("\nQuery failed: {}", err.user_message())).await?;
            match on_error {
                QueryErrorPolicy::Abort => Err(err.into()),
                QueryErrorPolicy::Continue => Ok(LoopControl::Continue),
            }
        }
    }
}

/// Only the exact word, in any letter case, ends the session.
fn is_quit(line: &str) -> bool {
    line.to_lowercase() == "quit"
}

async fn print_banner<W: AsyncWrite + Unpin>(output: &mut W) -> std::io::Result<()> {
    write_line(output, "\nMCP Client Started!").await?;
    write_line(output, "Type your queries or 'quit' to exit.").await
}

async fn prompt<W: AsyncWrite + Unpin>(output: &mut W) -> std::io::Result<()> {
    output.write_all(b"\nQuery: ").await?;
    output.flush().await
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    Ok(())
}
