//! Reviewer agents.
//!
//! Role definitions, the tool-calling agent loop, the tools it exposes to
//! the model, and the orchestrator that runs the whole panel.

pub mod agent_loop;
pub mod orchestrator;
pub mod roles;
pub mod tools;

pub use agent_loop::AgentConfig;
pub use orchestrator::ReviewOrchestrator;
