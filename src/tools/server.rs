//! Line-delimited JSON-RPC 2.0 tool server over stdio.
//!
//! Each stdin line is one request; each response is written to stdout as one
//! line. Logging goes to stderr, so stdout only ever carries protocol frames.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::catalog::{self, ToolBox, ToolError};
use crate::{analysis::CandleSource, constants};

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn failure(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
}

fn text_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}

pub struct Server<S> {
    tools: ToolBox<S>,
}

impl<S: CandleSource> Server<S> {
    pub fn new(tools: ToolBox<S>) -> Self {
        Self { tools }
    }

    /// Serves requests from stdin until it closes.
    pub async fn run(&self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        log::info!("Tool server listening on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut frame = response.to_string();
                frame.push('\n');
                stdout.write_all(frame.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        log::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handles one raw frame. Notifications produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Unparsable frame: {}", e);
                return Some(failure(Value::Null, PARSE_ERROR, e.to_string()));
            }
        };
        // A missing id marks a notification; an explicit null still gets a reply.
        let id = value.get("id").cloned();
        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let id = id.unwrap_or(Value::Null);
                return Some(failure(id, INVALID_REQUEST, e.to_string()));
            }
        };

        let id = id?;
        Some(match self.dispatch(&request.method, &request.params).await {
            Ok(result) => success(id, result),
            Err((code, message)) => failure(id, code, message),
        })
    }

    async fn dispatch(&self, method: &str, params: &Value) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": constants::PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": catalog::definitions() })),
            "tools/call" => {
                let call: CallParams = serde_json::from_value(params.clone())
                    .map_err(|e| (INVALID_PARAMS, e.to_string()))?;
                match self.tools.call(&call.name, &call.arguments).await {
                    Ok(text) => Ok(text_result(text, false)),
                    Err(ToolError::UnknownTool(name)) => {
                        log::warn!("Unknown tool requested: {}", name);
                        Err((INVALID_PARAMS, format!("Unknown tool: {}", name)))
                    }
                    Err(e) => {
                        log::error!("Tool {} failed: {}", call.name, e);
                        Ok(text_result(e.to_string(), true))
                    }
                }
            }
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        }
    }
}
