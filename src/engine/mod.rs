//! Reasoning engine abstraction.
//!
//! The agents talk to the language model through [`ReasoningEngine`]; the
//! Vertex AI Gemini client is the production implementation.

pub mod vertex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use vertex::{resolve_access_token, VertexConfig, VertexEngine};

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema (OpenAPI subset) of the arguments object.
    pub parameters: Value,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

/// The result of a function call, fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User(String),
    Model {
        text: String,
        calls: Vec<FunctionCall>,
        /// Opaque provider state that must be echoed back with the calls.
        signature: Option<String>,
    },
    FunctionResponses(Vec<FunctionResponse>),
}

/// Input to one model invocation.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub system_instruction: &'a str,
    pub turns: &'a [Turn],
    pub tools: &'a [FunctionDeclaration],
}

/// What the model answered in one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
    pub signature: Option<String>,
}

impl ModelTurn {
    #[cfg(test)]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn calls(function_calls: Vec<FunctionCall>) -> Self {
        Self {
            function_calls,
            ..Self::default()
        }
    }

    pub fn into_turn(self) -> Turn {
        Turn::Model {
            text: self.text,
            calls: self.function_calls,
            signature: self.signature,
        }
    }
}

/// Errors from the reasoning engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Unauthorized: check the Vertex AI access token")]
    Unauthorized,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Access token unavailable: {0}")]
    Auth(String),
}

/// A language model that can answer with text or function calls.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelTurn, EngineError>;

    /// Model identifier, for logs and the report.
    fn model_name(&self) -> &str;
}
