//! In-memory engine and gateway doubles for tests.

use crate::agent::tools::{REQUIRED_TOOLS, TOOL_GET_FILE_CONTENTS, TOOL_GET_PULL_REQUEST_FILES};
use crate::engine::{EngineError, GenerateRequest, ModelTurn, ReasoningEngine};
use crate::gateway::{GatewayError, ToolGateway};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

type Scripted = Result<ModelTurn, String>;

struct Route {
    /// Matched against the system instruction.
    pattern: String,
    replies: VecDeque<Scripted>,
    repeat: Option<Scripted>,
}

/// An engine that replays canned model turns.
///
/// Replies are picked by the first route whose pattern occurs in the
/// system instruction; an empty pattern matches everything.
pub struct ScriptedEngine {
    routes: Mutex<Vec<Route>>,
    instructions: Mutex<Vec<String>>,
    last_turn_count: Mutex<usize>,
}

impl ScriptedEngine {
    fn from_routes(routes: Vec<Route>) -> Self {
        Self {
            routes: Mutex::new(routes),
            instructions: Mutex::new(Vec::new()),
            last_turn_count: Mutex::new(0),
        }
    }

    /// Replies in order, for any instruction.
    pub fn sequence(replies: Vec<ModelTurn>) -> Self {
        Self::from_routes(vec![Route {
            pattern: String::new(),
            replies: replies.into_iter().map(Ok).collect(),
            repeat: None,
        }])
    }

    /// The same reply forever.
    pub fn repeat(reply: ModelTurn) -> Self {
        Self::from_routes(vec![Route {
            pattern: String::new(),
            replies: VecDeque::new(),
            repeat: Some(Ok(reply)),
        }])
    }

    /// No routes yet; add them with [`ScriptedEngine::route`].
    pub fn routed() -> Self {
        Self::from_routes(Vec::new())
    }

    /// Reply `reply` (forever) when the instruction contains `pattern`.
    pub fn route(self, pattern: &str, reply: ModelTurn) -> Self {
        self.push_route(pattern, Ok(reply))
    }

    /// Fail every call whose instruction contains `pattern`.
    pub fn route_error(self, pattern: &str, message: &str) -> Self {
        self.push_route(pattern, Err(message.to_string()))
    }

    fn push_route(self, pattern: &str, reply: Scripted) -> Self {
        self.routes.lock().unwrap().push(Route {
            pattern: pattern.to_string(),
            replies: VecDeque::new(),
            repeat: Some(reply),
        });
        self
    }

    /// Every system instruction seen, in call order.
    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }

    /// Number of turns in the most recent request.
    pub fn last_turn_count(&self) -> usize {
        *self.last_turn_count.lock().unwrap()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelTurn, EngineError> {
        self.instructions
            .lock()
            .unwrap()
            .push(request.system_instruction.to_string());
        *self.last_turn_count.lock().unwrap() = request.turns.len();

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| request.system_instruction.contains(&r.pattern))
            .ok_or_else(|| EngineError::InvalidResponse("no scripted route".to_string()))?;

        let reply = match route.replies.pop_front() {
            Some(reply) => reply,
            None => route
                .repeat
                .clone()
                .ok_or_else(|| EngineError::InvalidResponse("script exhausted".to_string()))?,
        };
        reply.map_err(EngineError::InvalidResponse)
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// A gateway serving a fixed pull request.
pub struct FakeGateway {
    files: Vec<String>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            files: vec!["src/main.rs".to_string()],
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every tool call fails with "Not Found".
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_files(mut self, files: &[&str]) -> Self {
        self.files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Names of the tools called so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolGateway for FakeGateway {
    async fn list_tools(&self) -> Result<Vec<String>, GatewayError> {
        Ok(REQUIRED_TOOLS.iter().map(|t| t.to_string()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, GatewayError> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.fail {
            return Err(GatewayError::Tool("Not Found".to_string()));
        }

        let output = match name {
            TOOL_GET_PULL_REQUEST_FILES => json!(self
                .files
                .iter()
                .map(|f| json!({"filename": f, "status": "modified"}))
                .collect::<Vec<_>>())
            .to_string(),
            TOOL_GET_FILE_CONTENTS => format!(
                "// {}\nfn main() {{}}\n",
                arguments.get("path").and_then(Value::as_str).unwrap_or("")
            ),
            _ => json!({"title": "Add feature", "state": "open"}).to_string(),
        };
        Ok(output)
    }
}
