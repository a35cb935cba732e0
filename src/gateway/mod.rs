//! Tool gateway abstraction.
//!
//! Repository reads (PR metadata, changed files, file contents) go through
//! [`ToolGateway`]. The GitHub MCP server is the production implementation.

pub mod mcp;

use async_trait::async_trait;
use serde_json::Value;

pub use mcp::{McpConfig, McpGateway};

/// Errors from the tool gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to tool gateway at {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unauthorized: check GITHUB_PERSONAL_ACCESS_TOKEN")]
    Unauthorized,

    #[error("Gateway error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid gateway response: {0}")]
    Protocol(String),

    /// The tool ran and reported a failure.
    #[error("{0}")]
    Tool(String),
}

/// Remote repository read operations, called by name with JSON arguments.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Names of the tools the gateway offers.
    async fn list_tools(&self) -> Result<Vec<String>, GatewayError>;

    /// Call one tool; returns its textual output.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, GatewayError>;
}
