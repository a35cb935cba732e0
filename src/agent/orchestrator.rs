//! Review orchestration.
//!
//! Runs the five specialists concurrently, waits for all of them, then runs
//! the tech lead over their outputs and aggregates the report. A specialist
//! that fails is recorded as having produced nothing; it never cancels the
//! others.

use crate::agent::agent_loop::{AgentConfig, ReviewAgent};
use crate::agent::roles::{
    kickoff_message, render_specialist_instruction, render_synthesis_instruction, ReviewerRole,
    SPECIALISTS, TECH_LEAD_NAME, TECH_LEAD_OUTPUT_KEY,
};
use crate::analysis::{aggregate, RunInfo, SpecialistOutcome};
use crate::engine::ReasoningEngine;
use crate::gateway::ToolGateway;
use crate::models::{ReviewReport, ReviewRequest};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Drives one full review of one pull request.
pub struct ReviewOrchestrator {
    engine: Arc<dyn ReasoningEngine>,
    gateway: Arc<dyn ToolGateway>,
    config: AgentConfig,
    show_progress: bool,
}

impl ReviewOrchestrator {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        gateway: Arc<dyn ToolGateway>,
        config: AgentConfig,
    ) -> Self {
        Self {
            engine,
            gateway,
            config,
            show_progress: false,
        }
    }

    /// Show one spinner per specialist while they run.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Review the pull request end to end.
    pub async fn review(&self, request: &ReviewRequest) -> ReviewReport {
        let start = Instant::now();
        info!("Starting review session {}", request.session_key());

        let outcomes = self.run_specialists(request).await;
        let synthesis = self.run_synthesis(request, &outcomes).await;

        aggregate(
            request,
            &outcomes,
            synthesis.as_deref(),
            RunInfo {
                model: self.engine.model_name().to_string(),
                duration_seconds: start.elapsed().as_secs_f64(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        )
    }

    /// Run every specialist concurrently. Outcomes come back in panel order.
    pub async fn run_specialists(&self, request: &ReviewRequest) -> Vec<SpecialistOutcome> {
        let multi = MultiProgress::new();
        let kickoff = kickoff_message(request);

        let futures = SPECIALISTS.into_iter().map(|role| {
            let spinner = self.spinner(&multi, &role);
            let kickoff = kickoff.as_str();
            async move {
                let output = self.run_specialist(&role, request, kickoff).await;
                match &output {
                    Some(_) => spinner.finish_with_message("✅ done"),
                    None => spinner.finish_with_message("❌ no output"),
                }
                SpecialistOutcome::new(role, output)
            }
        });

        let outcomes = join_all(futures).await;

        let produced = outcomes.iter().filter(|o| o.text().is_some()).count();
        info!(
            "Parallel review finished: {}/{} specialists produced output",
            produced,
            outcomes.len()
        );
        outcomes
    }

    async fn run_specialist(
        &self,
        role: &ReviewerRole,
        request: &ReviewRequest,
        kickoff: &str,
    ) -> Option<String> {
        let agent = ReviewAgent::with_tools(
            role.name,
            render_specialist_instruction(role, request),
            self.engine.clone(),
            self.gateway.clone(),
            self.config.clone(),
        );

        match agent.run(kickoff).await {
            Ok(text) => {
                info!("[{}] Stored {}", role.name, role.output_key());
                Some(text)
            }
            Err(e) => {
                error!("[{}] Review failed: {:#}", role.name, e);
                None
            }
        }
    }

    /// Run the tech lead over the specialist outputs. `None` when it fails.
    pub async fn run_synthesis(
        &self,
        request: &ReviewRequest,
        outcomes: &[SpecialistOutcome],
    ) -> Option<String> {
        let outputs: Vec<(ReviewerRole, Option<String>)> = outcomes
            .iter()
            .map(|o| (o.role, o.text().map(String::from)))
            .collect();

        let agent = ReviewAgent::without_tools(
            TECH_LEAD_NAME,
            render_synthesis_instruction(request, &outputs),
            self.engine.clone(),
            self.config.clone(),
        );

        let spinner = self.new_spinner(None, "Tech Lead");
        spinner.set_message("synthesizing...");

        match agent.run(&kickoff_message(request)).await {
            Ok(text) => {
                spinner.finish_with_message("✅ done");
                info!("[{}] Stored {}", TECH_LEAD_NAME, TECH_LEAD_OUTPUT_KEY);
                Some(text)
            }
            Err(e) => {
                spinner.finish_with_message("❌ failed");
                warn!("[{}] Synthesis failed, using defaults: {:#}", TECH_LEAD_NAME, e);
                None
            }
        }
    }

    fn spinner(&self, multi: &MultiProgress, role: &ReviewerRole) -> ProgressBar {
        let spinner = self.new_spinner(Some(multi), role.title);
        spinner.set_message("reviewing...");
        spinner
    }

    fn new_spinner(&self, multi: Option<&MultiProgress>, prefix: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let spinner = match multi {
            Some(multi) => multi.add(ProgressBar::new_spinner()),
            None => ProgressBar::new_spinner(),
        };
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed}] {prefix:.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_prefix(prefix.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ModelTurn;
    use crate::models::{DataAccessStatus, Recommendation};
    use crate::testing::{FakeGateway, ScriptedEngine};

    const TECH_LEAD: &str = "You are a Tech Lead";

    const CLEAN: &str = r#"{"pr_accessed": true, "files_in_diff": ["src/lib.rs"],
        "summary": "Looks good", "score": 9, "findings": [], "recommendation": "APPROVE"}"#;

    fn orchestrator(engine: Arc<ScriptedEngine>) -> ReviewOrchestrator {
        ReviewOrchestrator::new(
            engine,
            Arc::new(FakeGateway::new()),
            AgentConfig::default(),
        )
    }

    fn request() -> ReviewRequest {
        ReviewRequest::new("acme", "widgets", 21)
    }

    #[tokio::test]
    async fn test_all_clean_review_is_approved() {
        let engine = Arc::new(
            ScriptedEngine::routed()
                .route(
                    TECH_LEAD,
                    ModelTurn::text(r#"{"summary": "Clean", "overall_score": 9,
                        "auto_approve": true, "final_decision": "APPROVE"}"#),
                )
                .route("", ModelTurn::text(CLEAN)),
        );

        let report = orchestrator(engine.clone()).review(&request()).await;

        assert_eq!(report.data_access_status, DataAccessStatus::AllSuccess);
        assert!(report.auto_approve);
        assert_eq!(report.final_decision, Recommendation::Approve);
        assert_eq!(report.specialist_reviews.len(), 5);
        assert_eq!(report.files_reviewed.len(), 1);
        assert_eq!(report.model, "scripted-model");

        // five specialists, then the synthesis last
        let instructions = engine.instructions();
        assert_eq!(instructions.len(), 6);
        assert!(instructions[5].starts_with(TECH_LEAD));
        assert!(instructions[5].contains("Looks good"));
    }

    #[tokio::test]
    async fn test_critical_finding_requests_changes() {
        let engine = Arc::new(
            ScriptedEngine::routed()
                .route(
                    TECH_LEAD,
                    ModelTurn::text(r#"{"final_decision": "REQUEST_CHANGES",
                        "critical_blockers": ["Hardcoded credential"]}"#),
                )
                .route(
                    "You are a Security Engineer",
                    ModelTurn::text(r#"{"pr_accessed": true, "files_in_diff": ["src/auth.rs"],
                        "findings": [{"severity": "CRITICAL", "category": "Secrets",
                        "file": "src/auth.rs", "line": 4, "issue": "Hardcoded credential",
                        "recommendation": "Load from env"}],
                        "recommendation": "REQUEST_CHANGES"}"#),
                )
                .route("", ModelTurn::text(CLEAN)),
        );

        let report = orchestrator(engine).review(&request()).await;

        assert!(!report.auto_approve);
        assert_eq!(report.final_decision, Recommendation::RequestChanges);
        assert_eq!(report.critical_blockers, vec!["Hardcoded credential"]);
        assert_eq!(
            report.files_reviewed.iter().cloned().collect::<Vec<_>>(),
            vec!["src/auth.rs", "src/lib.rs"]
        );
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let engine = Arc::new(
            ScriptedEngine::routed()
                .route(
                    TECH_LEAD,
                    ModelTurn::text(r#"{"auto_approve": true, "final_decision": "APPROVE"}"#),
                )
                .route(
                    "You are a Product Owner",
                    ModelTurn::text(r#"{"pr_accessed": false,
                        "error": "Could not access PR data - tool call failed",
                        "files_in_diff": [], "findings": [], "recommendation": "COMMENT"}"#),
                )
                .route_error("You are a QA Engineer", "quota exceeded")
                .route("", ModelTurn::text(CLEAN)),
        );

        let report = orchestrator(engine.clone()).review(&request()).await;

        assert_eq!(report.data_access_status, DataAccessStatus::PartialFailure);
        assert_eq!(report.data_access_issues.len(), 2);
        assert!(!report.auto_approve);
        assert_eq!(report.specialist_reviews.len(), 4);

        let synthesis = engine.instructions().pop().unwrap();
        assert!(synthesis.contains("### qaengineer_review (QA Engineer)\n<no output"));
    }

    #[tokio::test]
    async fn test_synthesis_failure_degrades_to_defaults() {
        let engine = Arc::new(
            ScriptedEngine::routed()
                .route_error(TECH_LEAD, "engine unavailable")
                .route("", ModelTurn::text(CLEAN)),
        );

        let report = orchestrator(engine).review(&request()).await;

        assert_eq!(report.summary, crate::models::DEFAULT_SUMMARY);
        assert_eq!(report.overall_score, 0);
        // still clean, so the override approves
        assert!(report.auto_approve);
        assert_eq!(report.final_decision, Recommendation::Approve);
    }

    #[tokio::test]
    async fn test_inaccessible_gateway() {
        use crate::engine::FunctionCall;
        use serde_json::json;

        let engine = Arc::new(ScriptedEngine::sequence(vec![
            ModelTurn::calls(vec![FunctionCall {
                name: "get_pull_request".to_string(),
                args: json!({"owner": "acme", "repo": "widgets", "pull_number": 21}),
            }]),
            ModelTurn::text(r#"{"pr_accessed": false, "findings": []}"#),
        ]));
        let gateway = Arc::new(FakeGateway::failing());
        let orchestrator =
            ReviewOrchestrator::new(engine, gateway.clone(), AgentConfig::default());

        let outcomes = orchestrator.run_specialists(&request()).await;

        // only one specialist gets the scripted answer; the rest run dry
        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes.iter().filter(|o| o.text().is_some()).count(), 1);
        assert_eq!(gateway.calls(), vec!["get_pull_request"]);
    }
}
