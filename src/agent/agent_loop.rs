//! Agent loop for tool-calling reviews.
//!
//! One loop drives one role: send the conversation to the model, run any
//! function calls it asks for against the gateway, feed the results back,
//! and stop at the first text-only answer.

use crate::agent::tools::{get_tool_definitions, ToolExecutor};
use crate::engine::{FunctionDeclaration, FunctionResponse, GenerateRequest, ReasoningEngine, Turn};
use crate::gateway::ToolGateway;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for an agent run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model invocations allowed before giving up.
    pub max_turns: usize,
    /// Tool output longer than this is truncated before it reaches the model.
    pub max_tool_output_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 25,
            max_tool_output_chars: 60_000,
        }
    }
}

const NUDGE_MESSAGE: &str =
    "Your answer was empty. Please respond now with the final JSON object described in your instructions.";

/// A single role bound to the engine and, optionally, the gateway.
pub struct ReviewAgent {
    name: String,
    instruction: String,
    engine: Arc<dyn ReasoningEngine>,
    executor: Option<ToolExecutor>,
    tools: Vec<FunctionDeclaration>,
    config: AgentConfig,
}

impl ReviewAgent {
    /// An agent that can read the PR through the gateway.
    pub fn with_tools(
        name: impl Into<String>,
        instruction: String,
        engine: Arc<dyn ReasoningEngine>,
        gateway: Arc<dyn ToolGateway>,
        config: AgentConfig,
    ) -> Self {
        let name = name.into();
        Self {
            executor: Some(ToolExecutor::new(gateway, name.clone())),
            tools: get_tool_definitions(),
            name,
            instruction,
            engine,
            config,
        }
    }

    /// An agent that only reasons over what its instruction contains.
    pub fn without_tools(
        name: impl Into<String>,
        instruction: String,
        engine: Arc<dyn ReasoningEngine>,
        config: AgentConfig,
    ) -> Self {
        Self {
            name: name.into(),
            instruction,
            engine,
            executor: None,
            tools: Vec::new(),
            config,
        }
    }

    /// Run until the model answers in text. Returns that text.
    pub async fn run(&self, kickoff: &str) -> Result<String> {
        info!("[{}] Starting review", self.name);

        let mut turns = vec![Turn::User(kickoff.to_string())];
        let mut nudged = false;

        for iteration in 0..self.config.max_turns {
            debug!("[{}] Agent iteration {}", self.name, iteration + 1);

            let reply = self
                .engine
                .generate(GenerateRequest {
                    system_instruction: &self.instruction,
                    turns: &turns,
                    tools: &self.tools,
                })
                .await
                .with_context(|| format!("[{}] model call failed", self.name))?;

            if reply.function_calls.is_empty() {
                if !reply.text.trim().is_empty() {
                    info!(
                        "[{}] Finished after {} model calls ({} chars)",
                        self.name,
                        iteration + 1,
                        reply.text.len()
                    );
                    return Ok(reply.text);
                }
                if nudged {
                    bail!("[{}] model returned an empty answer", self.name);
                }
                warn!("[{}] Empty answer, asking again", self.name);
                nudged = true;
                turns.push(reply.into_turn());
                turns.push(Turn::User(NUDGE_MESSAGE.to_string()));
                continue;
            }

            let calls = reply.function_calls.clone();
            turns.push(reply.into_turn());

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let result = match &self.executor {
                    Some(executor) => executor.execute(call).await,
                    None => crate::agent::tools::ToolResult::error(format!(
                        "No tools are available; answer from the reviews you were given (called {})",
                        call.name
                    )),
                };
                info!(
                    "[{}] Tool {} executed ({})",
                    self.name,
                    call.name,
                    if result.success { "ok" } else { "error" }
                );

                let mut response = result.to_response();
                if let Some(content) = response.get_mut("content") {
                    let truncated = content
                        .as_str()
                        .map(|text| truncate_chars(text, self.config.max_tool_output_chars));
                    if let Some(text) = truncated {
                        *content = text.into();
                    }
                }
                responses.push(FunctionResponse {
                    name: call.name.clone(),
                    response,
                });
            }
            turns.push(Turn::FunctionResponses(responses));
        }

        bail!(
            "[{}] did not finish within {} model calls",
            self.name,
            self.config.max_turns
        )
    }
}

/// Truncate to at most `max` chars, marking the cut.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!(
            "{}\n... [truncated, {} more bytes]",
            &text[..cut],
            text.len() - cut
        ),
        None => text.to_string(),
    }
}
