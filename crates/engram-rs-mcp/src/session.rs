//! Subprocess-backed MCP session: spawn, handshake, discovery, calls.

use crate::codec::FrameDecoder;
use crate::error::McpError;
use engram_rs_config::McpServerConfig;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);
const PROTOCOL_VERSION: &str = "2024-11-05";

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, McpError>>>>>;

/// A tool advertised by the server during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredTool {
    /// Tool name as advertised.
    pub name: String,
    /// Tool description, empty when the server omitted one.
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub input_schema: Value,
}

/// One live connection to an MCP tool server.
pub struct McpSession {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
}

impl McpSession {
    /// Spawn the configured server and run the initialize handshake.
    pub async fn connect(config: &McpServerConfig) -> Result<Self, McpError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        for (key, value) in &config.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|err| McpError::SpawnFailed {
            command: config.command.clone(),
            message: err.to_string(),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| McpError::SpawnFailed {
            command: config.command.clone(),
            message: "failed to capture stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| McpError::SpawnFailed {
            command: config.command.clone(),
            message: "failed to capture stdout".to_string(),
        })?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        spawn_stdout_loop(stdout, pending.clone());
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_loop(stderr);
        }

        let session = Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
        };
        session.initialize().await?;
        info!("MCP session established (command={})", config.command);
        Ok(session)
    }

    async fn initialize(&self) -> Result<(), McpError> {
        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "clientInfo": {"name": "engram", "version": env!("CARGO_PKG_VERSION")}
                })),
            )
            .await?;

        if result.get("protocolVersion").is_none() {
            return Err(McpError::InvalidResponse(
                "initialize response missing protocolVersion".to_string(),
            ));
        }

        self.notify("notifications/initialized", None).await
    }

    /// Discover the tools the server advertises, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<DiscoveredTool>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match cursor.as_ref() {
                Some(cursor) => json!({"cursor": cursor}),
                None => json!({}),
            };
            let result = self.request("tools/list", Some(params)).await?;
            let page = result
                .get("tools")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    McpError::InvalidResponse("tools/list response missing tools".to_string())
                })?;

            for tool in page {
                let name = tool
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        McpError::InvalidResponse("advertised tool missing name".to_string())
                    })?
                    .to_string();
                tools.push(DiscoveredTool {
                    name,
                    description: tool
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    input_schema: tool.get("inputSchema").cloned().unwrap_or_else(|| json!({})),
                });
            }

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        debug!("discovered {} MCP tools", tools.len());
        Ok(tools)
    }

    /// Invoke a remote tool and flatten its content blocks to text.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, McpError> {
        let result = self
            .request("tools/call", Some(json!({"name": name, "arguments": arguments})))
            .await?;

        let text = flatten_content(&result);
        if result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(McpError::Protocol {
                code: -32000,
                message: if text.is_empty() {
                    format!("tool '{name}' reported an error")
                } else {
                    text
                },
            });
        }
        Ok(text)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params.unwrap_or_else(|| json!({})),
        }))
        .map_err(|err| McpError::Serialization(err.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(err) = self.write_frame(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(RPC_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(McpError::TransportClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(McpError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let payload = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or_else(|| json!({})),
        }))
        .map_err(|err| McpError::Serialization(err.to_string()))?;
        self.write_frame(&payload).await
    }

    async fn write_frame(&self, payload: &[u8]) -> Result<(), McpError> {
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(payload)
            .await
            .map_err(|_| McpError::TransportClosed)?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|_| McpError::TransportClosed)?;
        stdin.flush().await.map_err(|_| McpError::TransportClosed)
    }

    /// Close the session and reap the subprocess.
    pub async fn shutdown(&self) {
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        let _ = child.wait().await;
        info!("MCP session closed");
    }
}

/// Join the text items of a tools/call result's content array.
fn flatten_content(result: &Value) -> String {
    result
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn spawn_stdout_loop(mut stdout: ChildStdout, pending: PendingMap) {
    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut read_buf = [0u8; 8192];

        loop {
            match stdout.read(&mut read_buf).await {
                Ok(0) | Err(_) => {
                    fail_all_pending(&pending).await;
                    break;
                }
                Ok(n) => {
                    decoder.push(&read_buf[..n]);
                    while let Some(frame) = decoder.next_frame() {
                        route_frame(&frame, &pending).await;
                    }
                }
            }
        }
    });
}

async fn route_frame(frame: &[u8], pending: &PendingMap) {
    let parsed: Value = match serde_json::from_slice(frame) {
        Ok(value) => value,
        Err(err) => {
            warn!("failed to parse MCP message: {err}");
            return;
        }
    };

    let Some(id) = parsed.get("id").and_then(Value::as_u64) else {
        // Server-initiated notification; nothing to route.
        return;
    };

    if let Some(error) = parsed.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32000);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        if let Some(tx) = pending.lock().await.remove(&id) {
            let _ = tx.send(Err(McpError::Protocol { code, message }));
        }
        return;
    }

    if let Some(result) = parsed.get("result") {
        if let Some(tx) = pending.lock().await.remove(&id) {
            let _ = tx.send(Ok(result.clone()));
        }
    }
}

async fn fail_all_pending(pending: &PendingMap) {
    let mut lock = pending.lock().await;
    for (_, tx) in lock.drain() {
        let _ = tx.send(Err(McpError::TransportClosed));
    }
}

fn spawn_stderr_loop(stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        use tokio::io::{AsyncBufReadExt, BufReader};
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("mcp stderr: {line}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::flatten_content;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn flattens_text_content_blocks() {
        let result = json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "line two"}
            ]
        });
        assert_eq!(flatten_content(&result), "line one\nline two");
    }

    #[test]
    fn missing_content_flattens_to_empty() {
        assert_eq!(flatten_content(&json!({})), "");
    }
}
