//! MCP client over streamable HTTP (JSON-RPC 2.0 on a single POST endpoint).
//!
//! The `initialize` handshake runs lazily on first use and only once; the
//! `Mcp-Session-Id` header the server hands back is sent on every later
//! request. Responses may come back as plain JSON or as a short SSE stream.

use crate::backends::{ToolExecutor, ToolSource};
use crate::error::RemoteError;
use crate::execution::{ContentItem, ResultPayload};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";

pub struct McpClient {
    http: reqwest::Client,
    endpoint: String,
    session: OnceCell<Option<String>>,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            session: OnceCell::new(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue a request inside the (lazily initialized) session.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RemoteError> {
        let session = self
            .session
            .get_or_try_init(|| self.initialize())
            .await?
            .clone();

        self.post_rpc(session.as_deref(), method, params)
            .await
            .map(|(result, _)| result)
    }

    async fn initialize(&self) -> Result<Option<String>, RemoteError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        });

        let (result, session) = self.post_rpc(None, "initialize", params).await?;

        let server_info = result.get("serverInfo").cloned().unwrap_or(Value::Null);
        let protocol = result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(
            endpoint = %self.endpoint,
            server = %server_info,
            protocol,
            has_session = session.is_some(),
            "MCP session initialized"
        );

        self.notify(session.as_deref(), "notifications/initialized")
            .await?;

        Ok(session)
    }

    async fn notify(&self, session: Option<&str>, method: &str) -> Result<(), RemoteError> {
        let body = json!({ "jsonrpc": "2.0", "method": method });

        let mut request = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&body);
        if let Some(id) = session {
            request = request.header(SESSION_HEADER, id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status, body });
        }

        Ok(())
    }

    /// POST one JSON-RPC call; returns its `result` and any session id header.
    async fn post_rpc(
        &self,
        session: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<(Value, Option<String>), RemoteError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let mut request = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&body);
        if let Some(session_id) = session {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let message = if is_event_stream {
            find_sse_response(&text, id)?
        } else {
            serde_json::from_str(&text)
                .map_err(|e| RemoteError::Protocol(format!("invalid JSON-RPC body: {}", e)))?
        };

        Ok((rpc_result(message)?, session_id))
    }
}

#[async_trait]
impl ToolSource for McpClient {
    /// `tools/list`, following `nextCursor` until the listing is complete.
    async fn list_tools(&self) -> Result<Vec<Value>, RemoteError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;

            let page = result
                .get("tools")
                .and_then(Value::as_array)
                .ok_or_else(|| RemoteError::Protocol("tools/list result has no 'tools' array".into()))?;
            tools.extend(page.iter().cloned());

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_owned);
            match &cursor {
                None => break,
                Some(next) if !seen_cursors.insert(next.clone()) => {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        cursor = %next,
                        "tools/list repeated a cursor; stopping pagination"
                    );
                    break;
                }
                Some(_) => {}
            }
        }

        tracing::debug!(endpoint = %self.endpoint, count = tools.len(), "Listed MCP tools");
        Ok(tools)
    }
}

#[async_trait]
impl ToolExecutor for McpClient {
    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ResultPayload, RemoteError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;

        payload_from_call_result(result)
    }
}

/// Pick the JSON-RPC response with our id out of an SSE body.
///
/// Events are separated by blank lines; multi-line `data:` fields are joined
/// with newlines. Server notifications and unrelated messages are skipped.
fn find_sse_response(body: &str, id: u64) -> Result<Value, RemoteError> {
    let mut data = String::new();

    let check = |data: &mut String| -> Option<Value> {
        if data.is_empty() {
            return None;
        }
        let parsed = serde_json::from_str::<Value>(data).ok();
        data.clear();
        parsed.filter(|msg| msg.get("id") == Some(&json!(id)))
    };

    for line in body.lines() {
        if line.is_empty() {
            if let Some(message) = check(&mut data) {
                return Ok(message);
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    check(&mut data).ok_or_else(|| {
        RemoteError::Protocol(format!("event stream ended without a response to request {id}"))
    })
}

fn rpc_result(message: Value) -> Result<Value, RemoteError> {
    if let Some(error) = message.get("error") {
        return Err(RemoteError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    match message {
        Value::Object(mut object) => object
            .remove("result")
            .ok_or_else(|| RemoteError::Protocol("JSON-RPC response has no result".into())),
        _ => Err(RemoteError::Protocol("JSON-RPC response is not an object".into())),
    }
}

/// Map an MCP `CallToolResult` to a payload.
///
/// `text` blocks become text items; every other block and
/// `structuredContent` become structured items. The full result is kept as
/// the raw form. `isError: true` is a remote fault.
fn payload_from_call_result(result: Value) -> Result<ResultPayload, RemoteError> {
    let blocks = result
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut items: Vec<ContentItem> = blocks
        .into_iter()
        .map(|block| {
            let is_text = block.get("type").and_then(Value::as_str) == Some("text");
            match block.get("text").and_then(Value::as_str) {
                Some(text) if is_text => ContentItem::Text {
                    text: text.to_string(),
                },
                _ => ContentItem::Structured { value: block },
            }
        })
        .collect();

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let message: Vec<&str> = items
            .iter()
            .filter_map(|item| match item {
                ContentItem::Text { text } => Some(text.as_str()),
                ContentItem::Structured { .. } => None,
            })
            .collect();
        let message = if message.is_empty() {
            result.to_string()
        } else {
            message.join("\n")
        };
        return Err(RemoteError::ToolFailed(message));
    }

    if let Some(structured) = result.get("structuredContent").filter(|v| !v.is_null()) {
        items.push(ContentItem::Structured {
            value: structured.clone(),
        });
    }

    Ok(ResultPayload::new(items).with_raw(result))
}
