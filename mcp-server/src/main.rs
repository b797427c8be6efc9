// jdb-mcp server - debug-control broker over MCP
//
// Exposes symbolic-debugger tools to LLM agents via stdio JSON-RPC.

use anyhow::Result;
use jdb_mcp::connector::default_connector;
use jdb_mcp::protocol::*;
use jdb_mcp::{Debugger, RequestHandler};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing to stderr only - stdout is reserved for JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jdb_mcp=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("starting jdb-mcp server...");

    let debugger = Arc::new(Debugger::new(default_connector()));
    let handler = RequestHandler::new(debugger.clone());

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);

    info!("jdb-mcp server ready, waiting for requests...");

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!("client disconnected");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                debug!("received: {}", line);

                match serde_json::from_str::<Value>(line) {
                    Ok(value) => {
                        // Requests carry an id; notifications do not
                        if value.get("id").is_some() {
                            match serde_json::from_value::<JsonRpcRequest>(value) {
                                Ok(request) => {
                                    let response = handler.handle_request(request).await;
                                    write_response(&mut stdout, &response).await?;
                                }
                                Err(e) => {
                                    error!("invalid request: {}", e);
                                    let response = error_response(
                                        Value::Null,
                                        INVALID_REQUEST,
                                        "Invalid request",
                                    );
                                    write_response(&mut stdout, &response).await?;
                                }
                            }
                        } else {
                            match serde_json::from_value::<JsonRpcNotification>(value) {
                                Ok(notification) => {
                                    handler.handle_notification(notification).await;
                                }
                                Err(e) => {
                                    error!("invalid notification: {}", e);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("parse error: {}", e);
                        let response = error_response(Value::Null, PARSE_ERROR, "Parse error");
                        write_response(&mut stdout, &response).await?;
                    }
                }
            }
            Err(e) => {
                error!("read error: {}", e);
                break;
            }
        }
    }

    // Best-effort teardown of any live target
    debugger.disconnect().await;
    info!("jdb-mcp server shutting down");
    Ok(())
}

fn error_response(id: Value, code: i32, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        }),
    }
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> Result<()> {
    let text = serde_json::to_string(response)?;
    debug!("sending: {}", text);
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
