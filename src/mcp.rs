use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::ReadLogsRequest;
use crate::retriever::LogRetriever;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "mcp-log-reader";
pub const READ_LOGS_TOOL: &str = "read_mcp_logs";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".into(), id, result: Some(result), error: None }
    }

    fn err(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

pub async fn run_stdio(retriever: Arc<LogRetriever>) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(retriever, stdin, stdout).await
}

/// Newline-delimited JSON-RPC loop over any reader/writer pair.
pub async fn serve<R, W>(retriever: Arc<LogRetriever>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let resp = match parse_line(&line) {
            Ok(req) => process_request(&retriever, req).await,
            Err(err) => Some(err),
        };
        if let Some(resp) = resp {
            write_response(&mut writer, &resp).await?;
        }
    }
    Ok(())
}

/// Text that is not JSON is a parse error; JSON that is not a request is an invalid request.
fn parse_line(line: &str) -> std::result::Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| RpcResponse::err(Value::Null, PARSE_ERROR, format!("parse error: {e}")))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| RpcResponse::err(id, INVALID_REQUEST, format!("invalid request: {e}")))
}

/// Dispatch one request. Notifications (no id) produce no response.
pub async fn process_request(retriever: &LogRetriever, req: RpcRequest) -> Option<RpcResponse> {
    debug!("rpc method {}", req.method);
    if req.method.starts_with("notifications/") {
        if req.id.is_null() {
            return None;
        }
        return Some(RpcResponse::ok(req.id, json!({})));
    }

    let resp = match req.method.as_str() {
        "initialize" => RpcResponse::ok(req.id, initialize_result()),
        "ping" => RpcResponse::ok(req.id, json!({})),
        "tools/list" => RpcResponse::ok(req.id, json!({ "tools": [read_logs_tool()] })),
        "tools/call" => handle_call_tool(retriever, req).await,
        _ => RpcResponse::err(
            req.id,
            METHOD_NOT_FOUND,
            format!("method not found: {}", req.method),
        ),
    };
    Some(resp)
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

async fn handle_call_tool(retriever: &LogRetriever, req: RpcRequest) -> RpcResponse {
    let params: CallToolParams = match serde_json::from_value(req.params) {
        Ok(p) => p,
        Err(e) => return RpcResponse::err(req.id, INVALID_PARAMS, format!("invalid params: {e}")),
    };
    if params.name != READ_LOGS_TOOL {
        return RpcResponse::err(
            req.id,
            METHOD_NOT_FOUND,
            format!("Tool not found: {}", params.name),
        );
    }

    let args = match params.arguments {
        None | Some(Value::Null) => ReadLogsRequest::default(),
        Some(v) => match serde_json::from_value(v) {
            Ok(a) => a,
            Err(e) => {
                return RpcResponse::err(req.id, INVALID_PARAMS, format!("invalid arguments: {e}"))
            }
        },
    };

    match retriever.read_logs(&args).await {
        Ok(result) => {
            let structured = serde_json::to_value(&result).unwrap_or(Value::Null);
            let text = serde_json::to_string_pretty(&result).unwrap_or_default();
            RpcResponse::ok(
                req.id,
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": structured,
                    "isError": false
                }),
            )
        }
        Err(e) => {
            warn!("{READ_LOGS_TOOL} failed: {e}");
            RpcResponse::err(req.id, INTERNAL_ERROR, format!("Failed to read MCP logs: {e}"))
        }
    }
}

pub fn read_logs_tool() -> Value {
    json!({
        "name": READ_LOGS_TOOL,
        "description": "Read MCP logs from the standard location",
        "inputSchema": {
            "type": "object",
            "properties": {
                "lines": {
                    "type": "number",
                    "description": "Number of lines to read from the end of each log file (default: 100)"
                },
                "filter": {
                    "type": "string",
                    "description": "Optional text to filter log entries by (case-insensitive)"
                },
                "customPath": {
                    "type": "string",
                    "description": "Optional custom path to log directory (default is system-specific)"
                },
                "fileLimit": {
                    "type": "number",
                    "description": "Maximum number of files to read per page (default: 5)"
                },
                "page": {
                    "type": "number",
                    "description": "Page number for pagination (default: 1)"
                }
            }
        }
    })
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, resp: &RpcResponse) -> Result<()> {
    let line = serde_json::to_string(resp).unwrap_or_else(|_| "{}".to_string());
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
