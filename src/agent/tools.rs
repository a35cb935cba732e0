//! Tool definitions for the reviewer agents.
//!
//! Reviewers may only call the three read operations of the tool gateway.
//! This module declares them to the model and routes the model's calls to
//! the gateway.

use crate::engine::{FunctionCall, FunctionDeclaration};
use crate::gateway::{GatewayError, ToolGateway};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const TOOL_GET_PULL_REQUEST: &str = "get_pull_request";
pub const TOOL_GET_PULL_REQUEST_FILES: &str = "get_pull_request_files";
pub const TOOL_GET_FILE_CONTENTS: &str = "get_file_contents";

/// Tools every reviewer needs from the gateway.
pub const REQUIRED_TOOLS: [&str; 3] = [
    TOOL_GET_PULL_REQUEST,
    TOOL_GET_PULL_REQUEST_FILES,
    TOOL_GET_FILE_CONTENTS,
];

/// Required tools missing from what the gateway offers.
pub fn missing_tools(available: &[String]) -> Vec<&'static str> {
    REQUIRED_TOOLS
        .iter()
        .copied()
        .filter(|required| !available.iter().any(|t| t == required))
        .collect()
}

/// Result of executing a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Shape sent back to the model as a function response.
    pub fn to_response(&self) -> Value {
        if self.success {
            json!({ "content": self.output })
        } else {
            json!({ "error": self.error.clone().unwrap_or_default() })
        }
    }
}

/// Routes model function calls to the gateway.
pub struct ToolExecutor {
    gateway: Arc<dyn ToolGateway>,
    /// Agent name, for log prefixes.
    agent: String,
}

impl ToolExecutor {
    pub fn new(gateway: Arc<dyn ToolGateway>, agent: impl Into<String>) -> Self {
        Self {
            gateway,
            agent: agent.into(),
        }
    }

    /// Execute one function call. Gateway failures become error results
    /// so the model can report that it could not access the PR.
    pub async fn execute(&self, call: &FunctionCall) -> ToolResult {
        debug!(
            "[{}] Executing tool: {} with args: {}",
            self.agent, call.name, call.args
        );

        if !REQUIRED_TOOLS.contains(&call.name.as_str()) {
            return ToolResult::error(format!("Unknown tool: {}", call.name));
        }

        if let Err(message) = validate_arguments(&call.name, &call.args) {
            return ToolResult::error(message);
        }

        match self.gateway.call_tool(&call.name, call.args.clone()).await {
            Ok(output) => ToolResult::success(output),
            Err(GatewayError::Tool(message)) => {
                warn!("[{}] Tool {} returned an error: {}", self.agent, call.name, message);
                ToolResult::error(message)
            }
            Err(e) => {
                warn!("[{}] Tool {} failed: {}", self.agent, call.name, e);
                ToolResult::error(e.to_string())
            }
        }
    }
}

fn validate_arguments(tool: &str, args: &Value) -> Result<(), String> {
    let required: &[&str] = match tool {
        TOOL_GET_FILE_CONTENTS => &["owner", "repo", "path"],
        _ => &["owner", "repo", "pull_number"],
    };

    for key in required {
        if args.get(*key).map_or(true, Value::is_null) {
            return Err(format!("Missing required parameter: {}", key));
        }
    }
    Ok(())
}

/// Function declarations offered to the model.
pub fn get_tool_definitions() -> Vec<FunctionDeclaration> {
    let pr_parameters = json!({
        "type": "object",
        "properties": {
            "owner": {
                "type": "string",
                "description": "Repository owner"
            },
            "repo": {
                "type": "string",
                "description": "Repository name"
            },
            "pull_number": {
                "type": "integer",
                "description": "Pull request number"
            }
        },
        "required": ["owner", "repo", "pull_number"]
    });

    vec![
        FunctionDeclaration {
            name: TOOL_GET_PULL_REQUEST.to_string(),
            description: "Get details of a pull request: title, description, author, branches and state.".to_string(),
            parameters: pr_parameters.clone(),
        },
        FunctionDeclaration {
            name: TOOL_GET_PULL_REQUEST_FILES.to_string(),
            description: "List the files changed in a pull request, with their status and patch.".to_string(),
            parameters: pr_parameters,
        },
        FunctionDeclaration {
            name: TOOL_GET_FILE_CONTENTS.to_string(),
            description: "Get the contents of a file in a repository.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "owner": {
                        "type": "string",
                        "description": "Repository owner"
                    },
                    "repo": {
                        "type": "string",
                        "description": "Repository name"
                    },
                    "path": {
                        "type": "string",
                        "description": "Path to the file relative to the repository root"
                    },
                    "ref": {
                        "type": "string",
                        "description": "Optional git ref (branch, tag or sha)"
                    }
                },
                "required": ["owner", "repo", "path"]
            }),
        },
    ]
}
