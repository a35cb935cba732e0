//! GitHub MCP client over streamable HTTP.
//!
//! Speaks JSON-RPC 2.0: `initialize` once per process, then `tools/list`
//! and `tools/call`. The server may answer with plain JSON or with an SSE
//! stream carrying the JSON-RPC response in a `data:` line.

use super::{GatewayError, ToolGateway};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Settings for the MCP gateway client.
#[derive(Debug, Clone)]
pub struct McpConfig {
    pub url: String,
    pub token: String,
    pub timeout_seconds: u64,
}

/// MCP client shared by all reviewers of a run.
pub struct McpGateway {
    client: reqwest::Client,
    config: McpConfig,
    next_id: AtomicU64,
    /// Session id handed out by the server, if it uses sessions.
    session: OnceCell<Option<String>>,
}

impl McpGateway {
    pub fn new(config: McpConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        Ok(Self {
            client,
            config,
            next_id: AtomicU64::new(1),
            session: OnceCell::new(),
        })
    }

    async fn session_id(&self) -> Result<Option<String>, GatewayError> {
        self.session
            .get_or_try_init(|| self.initialize())
            .await
            .cloned()
    }

    async fn initialize(&self) -> Result<Option<String>, GatewayError> {
        info!("Initializing MCP session with {}", self.config.url);

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")}
        });
        let (result, session) = self.post_request("initialize", params, None).await?;

        let server = server_name(&result);
        debug!("MCP server: {}", server);

        self.post_notification("notifications/initialized", session.as_deref())
            .await?;

        Ok(session)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let session = self.session_id().await?;
        let (result, _) = self.post_request(method, params, session.as_deref()).await?;
        Ok(result)
    }

    fn post(&self, session: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream");
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }
        builder
    }

    async fn post_request(
        &self,
        method: &str,
        params: Value,
        session: Option<&str>,
    ) -> Result<(Value, Option<String>), GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

        let response = self
            .post(session)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let new_session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let message = if is_sse {
            parse_sse_response(&text, id)?
        } else {
            serde_json::from_str(&text)
                .map_err(|e| GatewayError::Protocol(format!("invalid JSON: {}", e)))?
        };

        Ok((rpc_result(message)?, new_session))
    }

    async fn post_notification(
        &self,
        method: &str,
        session: Option<&str>,
    ) -> Result<(), GatewayError> {
        let body = json!({"jsonrpc": "2.0", "method": method});
        let response = self
            .post(session)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    fn map_transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            GatewayError::Connect(self.config.url.clone())
        } else {
            GatewayError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl ToolGateway for McpGateway {
    async fn list_tools(&self) -> Result<Vec<String>, GatewayError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| GatewayError::Protocol("tools/list without tools".to_string()))?;

        Ok(tools
            .iter()
            .filter_map(|t| t.get("name").and_then(Value::as_str))
            .map(String::from)
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, GatewayError> {
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        tool_call_output(&result)
    }
}

/// Server name from an `initialize` result.
fn server_name(result: &Value) -> &str {
    result
        .pointer("/serverInfo/name")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// Pick the JSON-RPC response with `id` out of an SSE body.
fn parse_sse_response(body: &str, id: u64) -> Result<Value, GatewayError> {
    let mut last = None;
    for line in body.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let Ok(message) = serde_json::from_str::<Value>(data.trim()) else {
            continue;
        };
        if message.get("id").and_then(Value::as_u64) == Some(id) {
            return Ok(message);
        }
        last = Some(message);
    }

    last.ok_or_else(|| GatewayError::Protocol("no JSON-RPC message in event stream".to_string()))
}

fn rpc_result(message: Value) -> Result<Value, GatewayError> {
    if let Some(error) = message.get("error") {
        return Err(GatewayError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    message
        .get("result")
        .cloned()
        .ok_or_else(|| GatewayError::Protocol("response without result".to_string()))
}

/// Join the text content of a `tools/call` result; `isError` results
/// become [`GatewayError::Tool`].
fn tool_call_output(result: &Value) -> Result<String, GatewayError> {
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item.get("type").and_then(Value::as_str) {
                    Some("text") => item.get("text").and_then(Value::as_str).map(String::from),
                    Some("resource") => item
                        .pointer("/resource/text")
                        .and_then(Value::as_str)
                        .map(String::from),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(GatewayError::Tool(if text.is_empty() {
            "tool reported an error".to_string()
        } else {
            text
        }));
    }

    Ok(text)
}
