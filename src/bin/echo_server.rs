//! Minimal MCP server over stdio.
//!
//! Lists `echo` and `add` on the first `tools/list` page and `fail` on the
//! second; `fail` always answers with `isError: true`.

use mcp_chat_client::rpc::{INVALID_PARAMS, PARSE_ERROR, RpcRequest, RpcResponse};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};

const SECOND_PAGE: &str = "page-2";

fn main() -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) if request.is_notification() => None,
            Ok(request) => Some(handle(request)),
            Err(err) => Some(RpcResponse::error(None, PARSE_ERROR, err.to_string())),
        };

        if let Some(response) = response {
            let encoded = serde_json::to_string(&response).map_err(io::Error::other)?;
            writeln!(stdout, "{encoded}")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn handle(request: RpcRequest) -> RpcResponse {
    let id = request.id;
    let params = request.params.unwrap_or(Value::Null);
    match request.method.as_str() {
        "initialize" => RpcResponse::success(
            id,
            json!({
                "protocolVersion": params
                    .get("protocolVersion")
                    .cloned()
                    .unwrap_or_else(|| json!("2025-06-18")),
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": "mcp-echo-server",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => RpcResponse::success(id, list_page(params.get("cursor"))),
        "tools/call" => call(id, &params),
        other => RpcResponse::method_not_found(id, other),
    }
}

fn list_page(cursor: Option<&Value>) -> Value {
    match cursor.and_then(Value::as_str) {
        Some(SECOND_PAGE) => json!({
            "tools": [{
                "name": "fail",
                "description": "Always reports an error",
                "inputSchema": { "type": "object" },
            }],
        }),
        _ => json!({
            "tools": [
                {
                    "name": "echo",
                    "description": "Echo the given text",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "text": { "type": "string" } },
                        "required": ["text"],
                    },
                },
                {
                    "name": "add",
                    "description": "Add two numbers",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "a": { "type": "number" },
                            "b": { "type": "number" },
                        },
                        "required": ["a", "b"],
                    },
                },
            ],
            "nextCursor": SECOND_PAGE,
        }),
    }
}

fn call(id: Option<Value>, params: &Value) -> RpcResponse {
    let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
    match name {
        "echo" => {
            let text = arguments.get("text").and_then(Value::as_str).unwrap_or_default();
            RpcResponse::success(id, text_result(text, false))
        }
        "add" => {
            let operand = |key: &str| arguments.get(key).and_then(Value::as_f64);
            match (operand("a"), operand("b")) {
                (Some(a), Some(b)) => RpcResponse::success(id, text_result(&format_number(a + b), false)),
                _ => RpcResponse::error(id, INVALID_PARAMS, "add expects numeric 'a' and 'b'"),
            }
        }
        "fail" => RpcResponse::success(id, text_result("this tool always fails", true)),
        other => RpcResponse::error(id, INVALID_PARAMS, format!("unknown tool '{other}'")),
    }
}

fn text_result(text: &str, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
