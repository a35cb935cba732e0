//! Markdown and JSON report generation.
//!
//! The Markdown form is meant to be pasted as a PR comment; the JSON form
//! is the canonical result file.

use crate::models::{DataAccessStatus, Finding, Recommendation, ReviewReport, SpecialistPayload};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ReviewReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# PR Review: {}\n\n", report.pr));

    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_decision_section(report));
    output.push_str(&generate_data_access_section(report));
    output.push_str(&generate_list_section("🚫 Critical Blockers", &report.critical_blockers));
    output.push_str(&generate_list_section(
        "⚠️ Important Improvements",
        &report.important_improvements,
    ));
    output.push_str(&generate_list_section(
        "💡 Optional Suggestions",
        &report.optional_suggestions,
    ));
    output.push_str(&generate_specialists_section(&report.specialist_reviews));
    output.push_str(&generate_list_section("📋 Next Steps", &report.next_steps));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &ReviewReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Repository:** {}\n", report.repository));
    section.push_str(&format!("- **Pull Request:** #{}\n", report.pr_number));
    section.push_str(&format!("- **Review Date:** {}\n", report.timestamp));
    section.push_str(&format!("- **Model Used:** `{}`\n", report.model));
    section.push_str(&format!(
        "- **Files Reviewed:** {}\n",
        report.files_reviewed.len()
    ));
    section.push_str(&format!("- **Total Findings:** {}\n", report.total_findings()));
    section.push_str(&format!(
        "- **Review Duration:** {:.1}s\n",
        report.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_decision_section(report: &ReviewReport) -> String {
    let mut section = String::new();

    section.push_str("## Decision\n\n");
    section.push_str(&format!(
        "{} **{}** | Score: **{}/10**\n\n",
        report.final_decision.emoji(),
        report.final_decision,
        report.overall_score
    ));

    if report.auto_approve {
        section.push_str(&format!("> {}\n\n", report.congratulations_message));
    }

    section.push_str(&format!("{}\n\n", report.summary));
    if !report.rationale.is_empty() {
        section.push_str(&format!("**Rationale:** {}\n\n", report.rationale));
    }

    section
}

fn generate_data_access_section(report: &ReviewReport) -> String {
    if report.data_access_status == DataAccessStatus::AllSuccess {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Data Access\n\n");
    section.push_str(&format!(
        "Status: `{}`. Some specialists could not review the PR:\n\n",
        report.data_access_status
    ));
    for issue in &report.data_access_issues {
        section.push_str(&format!("- {}\n", issue));
    }
    section.push('\n');

    section
}

fn generate_list_section(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut section = format!("## {}\n\n", title);
    for item in items {
        section.push_str(&format!("- {}\n", item));
    }
    section.push('\n');

    section
}

fn generate_specialists_section(reviews: &[SpecialistPayload]) -> String {
    let mut section = String::new();

    section.push_str("## Specialist Reviews\n\n");
    if reviews.is_empty() {
        section.push_str("No specialist produced a review.\n\n");
        return section;
    }

    section.push_str("| Specialist | Accessed | Score | Recommendation | Findings |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
    for review in reviews {
        section.push_str(&format!(
            "| {} | {} | {}/10 | {} {} | {} |\n",
            review.role,
            if review.pr_accessed { "🔗" } else { "❌" },
            review.score,
            review.recommendation.emoji(),
            review.recommendation,
            review.findings.len()
        ));
    }
    section.push('\n');

    for review in reviews.iter().filter(|r| !r.findings.is_empty()) {
        section.push_str(&format!("### {} ({})\n\n", review.role, review.agent_name));
        let mut findings = review.findings.clone();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        for finding in &findings {
            section.push_str(&generate_finding_block(finding));
        }
    }

    section
}

/// Generate a single finding block.
fn generate_finding_block(finding: &Finding) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "#### {} **{}** {}\n\n",
        finding.severity.emoji(),
        finding.severity,
        finding.category
    ));

    let location = match finding.line {
        Some(line) => format!("`{}:{}`", finding.file, line),
        None => format!("`{}`", finding.file),
    };
    block.push_str(&format!("**Location:** {}\n\n", location));

    if !finding.issue.is_empty() {
        block.push_str(&format!("{}\n\n", finding.issue));
    }

    if let Some(ref current) = finding.current_code {
        block.push_str("<details>\n<summary>Current code</summary>\n\n```\n");
        block.push_str(current);
        block.push_str("\n```\n</details>\n\n");
    }
    if let Some(ref suggested) = finding.suggested_code {
        block.push_str("**Suggested:**\n\n```\n");
        block.push_str(suggested);
        block.push_str("\n```\n\n");
    }

    if !finding.recommendation.is_empty() {
        block.push_str(&format!("> 💡 **Fix:** {}\n\n", finding.recommendation));
    }

    block.push_str("---\n\n");

    block
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Review generated by {} v{}*\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ReviewReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write the JSON report to a file.
pub fn write_json_report(report: &ReviewReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;
    write_file(path, &content)
}

/// Write the Markdown report to a file.
pub fn write_markdown_report(report: &ReviewReport, path: &Path) -> Result<()> {
    write_file(path, &generate_markdown_report(report))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// One-line verdict, e.g. `✅ APPROVE (auto-approved)`.
pub fn decision_line(decision: Recommendation, auto_approve: bool) -> String {
    if auto_approve {
        format!("{} {} (auto-approved)", decision.emoji(), decision)
    } else {
        format!("{} {}", decision.emoji(), decision)
    }
}
