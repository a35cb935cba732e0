//! Result aggregation.
//!
//! Turns the raw specialist outputs and the tech lead's synthesis into the
//! final [`ReviewReport`]. The data-access status and the auto-approve
//! decision are computed here from the specialist payloads, not taken from
//! the synthesis.

use crate::agent::roles::ReviewerRole;
use crate::analysis::extractor::{extract_payload, has_payload};
use crate::models::{
    DataAccessStatus, Recommendation, ReviewReport, ReviewRequest, SpecialistPayload,
    SynthesisPayload,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// What one specialist produced. `output` is `None` when the run failed.
#[derive(Debug, Clone)]
pub struct SpecialistOutcome {
    pub role: ReviewerRole,
    pub output: Option<String>,
}

impl SpecialistOutcome {
    pub fn new(role: ReviewerRole, output: Option<String>) -> Self {
        Self { role, output }
    }

    /// The output, if it has any non-whitespace content.
    pub fn text(&self) -> Option<&str> {
        self.output.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Run metadata recorded on the report.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub model: String,
    pub duration_seconds: f64,
    pub timestamp: String,
}

/// Data-access issues and the resulting status.
#[derive(Debug, Clone, PartialEq)]
pub struct DataAccess {
    pub status: DataAccessStatus,
    pub issues: Vec<String>,
}

/// Parse every specialist output that exists.
pub fn parse_specialists(
    request: &ReviewRequest,
    outcomes: &[SpecialistOutcome],
) -> Vec<SpecialistPayload> {
    outcomes
        .iter()
        .filter_map(|outcome| {
            let text = outcome.text()?;
            if !has_payload(text) {
                warn!("[{}] Output has no JSON object, using fallback", outcome.role.name);
            }
            let value = extract_payload(text);
            Some(SpecialistPayload::from_value(
                &value,
                outcome.role.name,
                outcome.role.title,
                request,
            ))
        })
        .collect()
}

/// One issue per specialist that produced nothing or could not read the PR.
pub fn assess_data_access(
    outcomes: &[SpecialistOutcome],
    payloads: &[SpecialistPayload],
) -> DataAccess {
    let mut issues = Vec::new();

    for outcome in outcomes {
        if outcome.text().is_none() {
            issues.push(format!("{}: No review output", outcome.role.name));
            continue;
        }
        let inaccessible = payloads
            .iter()
            .any(|p| p.agent_name == outcome.role.name && !p.pr_accessed);
        if inaccessible {
            issues.push(format!("{}: Could not access PR data", outcome.role.name));
        }
    }

    DataAccess {
        status: DataAccessStatus::classify(issues.len(), outcomes.len()),
        issues,
    }
}

/// Union of every specialist's file list.
pub fn collect_files(payloads: &[SpecialistPayload]) -> BTreeSet<String> {
    payloads
        .iter()
        .flat_map(|p| p.files_in_diff.iter())
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// Build the final report.
///
/// A clean review with full data access is always approved. Any other
/// outcome never auto-approves, whatever the synthesis says.
pub fn aggregate(
    request: &ReviewRequest,
    outcomes: &[SpecialistOutcome],
    synthesis_text: Option<&str>,
    run: RunInfo,
) -> ReviewReport {
    let payloads = parse_specialists(request, outcomes);
    let access = assess_data_access(outcomes, &payloads);
    let files_reviewed = collect_files(&payloads);
    let total_findings: usize = payloads.iter().map(|p| p.findings.len()).sum();

    let synthesis = match synthesis_text.filter(|t| !t.trim().is_empty()) {
        Some(text) => SynthesisPayload::from_value(&extract_payload(text)),
        None => {
            warn!("No synthesis output, using defaults");
            SynthesisPayload::default()
        }
    };

    if let Some(reported) = &synthesis.data_access_status {
        if *reported != access.status.to_string() {
            debug!(
                "Synthesis reported data access {}, computed {}",
                reported, access.status
            );
        }
    }

    let clean = total_findings == 0 && access.status == DataAccessStatus::AllSuccess;
    let (auto_approve, final_decision) = if clean {
        (true, Recommendation::Approve)
    } else {
        if synthesis.final_decision == Recommendation::Approve
            && payloads.iter().any(SpecialistPayload::has_critical)
        {
            warn!("Synthesis approved a PR with CRITICAL findings");
        }
        if synthesis.auto_approve {
            warn!(
                "Ignoring auto_approve from synthesis ({} findings, data access {})",
                total_findings, access.status
            );
        }
        (false, synthesis.final_decision)
    };

    ReviewReport {
        pr: request.pr_ref(),
        repository: request.full_name(),
        pr_number: request.pr_number,
        timestamp: run.timestamp,
        model: run.model,
        duration_seconds: run.duration_seconds,
        data_access_status: access.status,
        data_access_issues: access.issues,
        files_reviewed,
        summary: synthesis.summary,
        overall_score: synthesis.overall_score,
        auto_approve,
        congratulations_message: synthesis.congratulations_message,
        final_decision,
        critical_blockers: synthesis.critical_blockers,
        important_improvements: synthesis.important_improvements,
        optional_suggestions: synthesis.optional_suggestions,
        inline_comments: synthesis.inline_comments,
        specialist_reviews: payloads,
        rationale: synthesis.rationale,
        next_steps: synthesis.next_steps,
    }
}
