use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const SERVER_NAME: &str = "stub-tool-server";

#[derive(Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn tools() -> Value {
    json!([
        {
            "name": "echo",
            "description": "Echo the given text back",
            "inputSchema": {
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }
        },
        {
            "name": "fail",
            "description": "Always reports a tool error",
            "inputSchema": {"type": "object", "properties": {}}
        }
    ])
}

fn call_tool(params: &Value) -> Result<Value, RpcError> {
    match params["name"].as_str() {
        Some("echo") => {
            let text = params["arguments"]["text"].as_str().unwrap_or_default();
            Ok(json!({"content": [{"type": "text", "text": text}], "isError": false}))
        }
        Some("fail") => Ok(json!({
            "content": [{"type": "text", "text": "stub failure"}],
            "isError": true
        })),
        other => Err(RpcError {
            code: -32602,
            message: format!("Unknown tool: {}", other.unwrap_or_default()),
        }),
    }
}

fn handle(request: &Request) -> Result<Value, RpcError> {
    match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": request.params["protocolVersion"].as_str().unwrap_or("2024-11-05"),
            "capabilities": {"tools": {}},
            "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")}
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({"tools": tools()})),
        "tools/call" => call_tool(&request.params),
        method => Err(RpcError {
            code: -32601,
            message: format!("Method not found: {}", method),
        }),
    }
}

/// Serves a fixed pair of tools over newline-delimited JSON-RPC on stdin/stdout
#[tokio::main]
async fn main() -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                eprintln!("{}: ignoring malformed message: {}", SERVER_NAME, e);
                continue;
            }
        };

        // Notifications carry no id and get no reply
        let Some(id) = request.id.clone() else {
            continue;
        };

        let response = match handle(&request) {
            Ok(result) => Response {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                jsonrpc: "2.0",
                id,
                result: None,
                error: Some(error),
            },
        };

        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        stdout.write_all(payload.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
