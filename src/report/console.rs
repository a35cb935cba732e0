//! Console rendering of a finished review.

use super::generator::decision_line;
use crate::models::{Finding, ReviewReport, SpecialistPayload};
use std::fmt::Write;

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "------------------------------------------------------------";
const MAX_REPORT_FILES: usize = 20;
const MAX_SPECIALIST_FILES: usize = 10;
const MAX_CODE_CHARS: usize = 200;

/// Print the review summary and every specialist's details to stdout.
pub fn print_summary(report: &ReviewReport) {
    print!("{}", render_summary(report));
}

/// Render what [`print_summary`] prints.
pub fn render_summary(report: &ReviewReport) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, report: &ReviewReport) -> std::fmt::Result {
    writeln!(out, "\n{}", RULE)?;
    writeln!(out, "📋 REVIEW SUMMARY")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "📦 Repository: {}", report.repository)?;
    writeln!(out, "🔢 PR Number: #{}", report.pr_number)?;
    writeln!(out, "📊 Overall Score: {}/10", report.overall_score)?;
    writeln!(
        out,
        "🎯 Decision: {}",
        decision_line(report.final_decision, report.auto_approve)
    )?;
    writeln!(out, "📁 Data Access: {}", report.data_access_status)?;

    writeln!(out, "\n📂 Files Reviewed ({}):", report.files_reviewed.len())?;
    if report.files_reviewed.is_empty() {
        writeln!(out, "   ⚠️ No files found in diff or could not access PR data")?;
    } else {
        for file in report.files_reviewed.iter().take(MAX_REPORT_FILES) {
            writeln!(out, "   - {}", file)?;
        }
        if report.files_reviewed.len() > MAX_REPORT_FILES {
            writeln!(
                out,
                "   ... and {} more files",
                report.files_reviewed.len() - MAX_REPORT_FILES
            )?;
        }
    }

    if !report.data_access_issues.is_empty() {
        writeln!(out, "\n⚠️ Data Access Issues:")?;
        for issue in &report.data_access_issues {
            writeln!(out, "   - {}", issue)?;
        }
    }

    writeln!(out, "\n📝 Summary:\n{}", report.summary)?;
    if report.auto_approve {
        writeln!(out, "\n{}", report.congratulations_message)?;
    }

    write_list(out, "🚫 Critical Blockers", &report.critical_blockers)?;
    write_list(out, "⚠️ Important Improvements", &report.important_improvements)?;

    writeln!(out, "\n{}", RULE)?;
    writeln!(out, "👥 DETAILED SPECIALIST REVIEWS")?;
    writeln!(out, "{}", RULE)?;
    for review in &report.specialist_reviews {
        write_specialist(out, review)?;
    }

    write_list(out, "📋 Next Steps", &report.next_steps)?;

    writeln!(out, "\n{}", RULE)?;
    writeln!(out, "✅ Review Complete!")?;
    writeln!(out, "{}\n", RULE)
}

fn write_list(out: &mut String, title: &str, items: &[String]) -> std::fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{}:", title)?;
    for item in items {
        writeln!(out, "  - {}", item)?;
    }
    Ok(())
}

fn write_specialist(out: &mut String, review: &SpecialistPayload) -> std::fmt::Result {
    let access_icon = if review.pr_accessed { "🔗" } else { "❌" };

    writeln!(out, "\n{}", THIN_RULE)?;
    writeln!(
        out,
        "{} {} - {}",
        review.recommendation.emoji(),
        review.agent_name,
        review.role
    )?;
    writeln!(out, "{}", THIN_RULE)?;
    writeln!(out, "   {} PR Accessed: {}", access_icon, review.pr_accessed)?;
    writeln!(out, "   📊 Score: {}/10", review.score)?;
    writeln!(out, "   🎯 Recommendation: {}", review.recommendation)?;

    writeln!(out, "   📁 Files Reviewed ({}):", review.files_in_diff.len())?;
    for file in review.files_in_diff.iter().take(MAX_SPECIALIST_FILES) {
        writeln!(out, "      - {}", file)?;
    }
    if review.files_in_diff.len() > MAX_SPECIALIST_FILES {
        writeln!(
            out,
            "      ... and {} more",
            review.files_in_diff.len() - MAX_SPECIALIST_FILES
        )?;
    }

    writeln!(out, "\n   📝 Summary: {}", or_na(&review.summary))?;
    writeln!(out, "   💡 Rationale: {}", or_na(&review.rationale))?;
    if let Some(error) = &review.error {
        writeln!(out, "   ❌ Error: {}", error)?;
    }

    if review.findings.is_empty() {
        return writeln!(out, "\n   ✅ No issues found in focus areas");
    }

    writeln!(out, "\n   🔍 Findings ({}):", review.findings.len())?;
    for (i, finding) in review.findings.iter().enumerate() {
        write_finding(out, i + 1, finding)?;
    }
    Ok(())
}

fn write_finding(out: &mut String, index: usize, finding: &Finding) -> std::fmt::Result {
    writeln!(
        out,
        "\n   {}. {} [{}] {}",
        index,
        finding.severity.emoji(),
        finding.severity,
        finding.category
    )?;
    writeln!(out, "      📄 File: {}", or_na(&finding.file))?;
    match finding.line {
        Some(line) => writeln!(out, "      📍 Line: {}", line)?,
        None => writeln!(out, "      📍 Line: N/A")?,
    }
    writeln!(out, "      ❗ Issue: {}", or_na(&finding.issue))?;
    if let Some(code) = &finding.current_code {
        let snippet: String = code.chars().take(MAX_CODE_CHARS).collect();
        writeln!(out, "      💻 Code: {}...", snippet)?;
    }
    writeln!(out, "      💡 Fix: {}", or_na(&finding.recommendation))
}

fn or_na(s: &str) -> &str {
    if s.is_empty() {
        "N/A"
    } else {
        s
    }
}
