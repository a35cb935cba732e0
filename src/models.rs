//! Data models for the review panel.
//!
//! This module contains the core data structures shared by the agents,
//! the extractor, the aggregator and the report writers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Identifies the pull request a single run reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub owner: String,
    pub repository: String,
    pub pr_number: u64,
}

impl ReviewRequest {
    pub fn new(owner: impl Into<String>, repository: impl Into<String>, pr_number: u64) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            pr_number,
        }
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }

    /// `owner/repo#N`
    pub fn pr_ref(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repository, self.pr_number)
    }

    /// Key of the per-run session; no two runs share one.
    pub fn session_key(&self) -> String {
        format!(
            "review_{}_{}_{}",
            self.owner, self.repository, self.pr_number
        )
    }
}

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Low severity - style issues, minor suggestions
    Low,
    /// Medium severity - code quality issues, potential bugs
    Medium,
    /// High severity - bugs, security concerns
    High,
    /// Critical severity - merge blockers
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }

    /// Lenient parse. Accepts any case and decorated labels like "🔴 Critical";
    /// anything unrecognised is treated as low.
    pub fn parse_lenient(s: &str) -> Self {
        let lower = s.to_lowercase();
        if lower.contains("critical") {
            Severity::Critical
        } else if lower.contains("high") {
            Severity::High
        } else if lower.contains("medium") {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Verdict a reviewer (or the tech lead) gives on the pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    RequestChanges,
    #[default]
    Comment,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Approve => write!(f, "APPROVE"),
            Recommendation::RequestChanges => write!(f, "REQUEST_CHANGES"),
            Recommendation::Comment => write!(f, "COMMENT"),
        }
    }
}

impl Recommendation {
    /// Lenient parse; unknown values fall back to `Comment`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "APPROVE" | "APPROVED" => Recommendation::Approve,
            "REQUEST_CHANGES" | "CHANGES_REQUESTED" => Recommendation::RequestChanges,
            _ => Recommendation::Comment,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Recommendation::Approve => "✅",
            Recommendation::RequestChanges => "⚠️",
            Recommendation::Comment => "💬",
        }
    }
}

/// Aggregate indicator of whether the specialists could read the PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAccessStatus {
    AllSuccess,
    PartialFailure,
    AllFailed,
}

impl DataAccessStatus {
    /// Classify from the number of roles that failed to access data
    /// (or produced nothing) out of `total` roles.
    pub fn classify(failed: usize, total: usize) -> Self {
        if failed == 0 {
            DataAccessStatus::AllSuccess
        } else if failed >= total {
            DataAccessStatus::AllFailed
        } else {
            DataAccessStatus::PartialFailure
        }
    }
}

impl fmt::Display for DataAccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAccessStatus::AllSuccess => write!(f, "all_success"),
            DataAccessStatus::PartialFailure => write!(f, "partial_failure"),
            DataAccessStatus::AllFailed => write!(f, "all_failed"),
        }
    }
}

/// A single issue reported by a specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: String,
    /// Path of the file in the diff.
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    pub issue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_code: Option<String>,
    pub recommendation: String,
}

impl Finding {
    /// Any non-null entry is a finding. Bare strings keep their text as the
    /// issue and their severity is read from it.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = match value {
            Value::Null => return None,
            Value::Object(obj) => obj,
            Value::String(text) if text.trim().is_empty() => return None,
            Value::String(text) => return Some(Self::from_text(text.trim())),
            other => return Some(Self::from_text(&other.to_string())),
        };
        Some(Self {
            severity: Severity::parse_lenient(str_field(value, "severity").unwrap_or("low")),
            category: str_field(value, "category")
                .unwrap_or("General")
                .to_string(),
            file: str_field(value, "file")
                .or_else(|| str_field(value, "path"))
                .unwrap_or("")
                .to_string(),
            line: obj.get("line").and_then(as_u64_lenient),
            issue: str_field(value, "issue").unwrap_or("").to_string(),
            current_code: str_field(value, "current_code")
                .or_else(|| str_field(value, "code_snippet"))
                .map(String::from),
            suggested_code: str_field(value, "suggested_code").map(String::from),
            recommendation: str_field(value, "recommendation").unwrap_or("").to_string(),
        })
    }

    fn from_text(text: &str) -> Self {
        Self {
            severity: Severity::parse_lenient(text),
            category: "General".to_string(),
            file: String::new(),
            line: None,
            issue: text.to_string(),
            current_code: None,
            suggested_code: None,
            recommendation: String::new(),
        }
    }

    /// `findings` as a list; a single object or string counts as one entry.
    fn list_from_value(value: Option<&Value>) -> Vec<Self> {
        match value {
            Some(Value::Array(items)) => items.iter().filter_map(Self::from_value).collect(),
            Some(single @ (Value::Object(_) | Value::String(_))) => {
                Self::from_value(single).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }
}

/// The structured review one specialist produced, after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistPayload {
    pub agent_name: String,
    pub role: String,
    pub pr_accessed: bool,
    pub repository: String,
    pub pr_number: u64,
    pub files_in_diff: Vec<String>,
    pub summary: String,
    /// 1-10; 0 when the reviewer gave no score.
    pub score: u8,
    pub findings: Vec<Finding>,
    pub findings_count: usize,
    pub recommendation: Recommendation,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpecialistPayload {
    /// Build from an extracted JSON object. Fields the model left out take
    /// the role's identity or neutral defaults.
    pub fn from_value(value: &Value, agent_name: &str, role: &str, request: &ReviewRequest) -> Self {
        let files_in_diff = string_list(value, "files_in_diff")
            .or_else(|| string_list(value, "files_reviewed"))
            .unwrap_or_default();

        let findings = Finding::list_from_value(value.get("findings"));

        Self {
            agent_name: agent_name.to_string(),
            role: str_field(value, "agent_role").unwrap_or(role).to_string(),
            pr_accessed: value.get("pr_accessed").map_or(true, is_truthy),
            repository: str_field(value, "repository")
                .map(String::from)
                .unwrap_or_else(|| request.full_name()),
            pr_number: value
                .get("pr_number")
                .and_then(as_u64_lenient)
                .unwrap_or(request.pr_number),
            files_in_diff,
            summary: str_field(value, "summary").unwrap_or("").to_string(),
            score: score_field(value, "score"),
            findings_count: findings.len(),
            findings,
            recommendation: str_field(value, "recommendation")
                .map(Recommendation::parse_lenient)
                .unwrap_or_default(),
            rationale: str_field(value, "rationale").unwrap_or("").to_string(),
            error: str_field(value, "error").map(String::from),
        }
    }

    pub fn has_critical(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == Severity::Critical)
    }
}

/// An inline review comment the tech lead proposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineComment {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    pub side: String,
    pub body: String,
}

impl InlineComment {
    fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            path: str_field(value, "path")?.to_string(),
            line: value.get("line").and_then(as_u64_lenient),
            side: str_field(value, "side").unwrap_or("RIGHT").to_string(),
            body: str_field(value, "body").unwrap_or("").to_string(),
        })
    }
}

/// Denormalized per-specialist summary inside the synthesis payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistSummary {
    pub agent: String,
    pub role: String,
    pub pr_accessed: bool,
    pub files_reviewed: Vec<String>,
    pub score: u8,
    pub recommendation: Recommendation,
    pub findings_count: usize,
    pub key_findings: Vec<String>,
}

impl SpecialistSummary {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            agent: str_field(value, "agent").unwrap_or("").to_string(),
            role: str_field(value, "role").unwrap_or("").to_string(),
            pr_accessed: value.get("pr_accessed").map_or(true, is_truthy),
            files_reviewed: string_list(value, "files_reviewed").unwrap_or_default(),
            score: score_field(value, "score"),
            recommendation: str_field(value, "recommendation")
                .map(Recommendation::parse_lenient)
                .unwrap_or_default(),
            findings_count: value
                .get("findings_count")
                .and_then(as_u64_lenient)
                .unwrap_or(0) as usize,
            key_findings: string_list(value, "key_findings").unwrap_or_default(),
        })
    }
}

/// Default celebratory message when the tech lead gives none.
pub const DEFAULT_CONGRATULATIONS: &str =
    "🎉 Great work! This PR looks clean and well-structured. Keep it up! 🚀✨";

/// Default summary when the synthesis produced nothing usable.
pub const DEFAULT_SUMMARY: &str = "Review completed";

/// The tech lead's consolidated payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisPayload {
    pub summary: String,
    pub overall_score: u8,
    pub auto_approve: bool,
    pub congratulations_message: String,
    /// What the tech lead itself reported; the report uses the computed status.
    pub data_access_status: Option<String>,
    pub files_reviewed: Vec<String>,
    pub critical_blockers: Vec<String>,
    pub important_improvements: Vec<String>,
    pub optional_suggestions: Vec<String>,
    pub inline_comments: Vec<InlineComment>,
    pub specialist_reviews: Vec<SpecialistSummary>,
    pub final_decision: Recommendation,
    pub rationale: String,
    pub next_steps: Vec<String>,
}

impl Default for SynthesisPayload {
    fn default() -> Self {
        Self {
            summary: DEFAULT_SUMMARY.to_string(),
            overall_score: 0,
            auto_approve: false,
            congratulations_message: DEFAULT_CONGRATULATIONS.to_string(),
            data_access_status: None,
            files_reviewed: Vec::new(),
            critical_blockers: Vec::new(),
            important_improvements: Vec::new(),
            optional_suggestions: Vec::new(),
            inline_comments: Vec::new(),
            specialist_reviews: Vec::new(),
            final_decision: Recommendation::Comment,
            rationale: String::new(),
            next_steps: Vec::new(),
        }
    }
}

impl SynthesisPayload {
    /// Build from an extracted JSON object, defaulting every missing field.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        Self {
            summary: str_field(value, "summary")
                .map(String::from)
                .unwrap_or(defaults.summary),
            overall_score: score_field(value, "overall_score"),
            auto_approve: value
                .get("auto_approve")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            congratulations_message: str_field(value, "congratulations_message")
                .map(String::from)
                .unwrap_or(defaults.congratulations_message),
            data_access_status: str_field(value, "data_access_status").map(String::from),
            files_reviewed: string_list(value, "files_reviewed").unwrap_or_default(),
            critical_blockers: string_list(value, "critical_blockers").unwrap_or_default(),
            important_improvements: string_list(value, "important_improvements")
                .unwrap_or_default(),
            optional_suggestions: string_list(value, "optional_suggestions").unwrap_or_default(),
            inline_comments: object_list(value, "inline_comments", InlineComment::from_value),
            specialist_reviews: object_list(
                value,
                "specialist_reviews",
                SpecialistSummary::from_value,
            ),
            final_decision: str_field(value, "final_decision")
                .map(Recommendation::parse_lenient)
                .unwrap_or_default(),
            rationale: str_field(value, "rationale").unwrap_or("").to_string(),
            next_steps: string_list(value, "next_steps").unwrap_or_default(),
        }
    }
}

/// The complete review report written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    /// `owner/repo#N`
    pub pr: String,
    pub repository: String,
    pub pr_number: u64,
    /// RFC 3339 time the report was assembled.
    pub timestamp: String,
    pub model: String,
    pub duration_seconds: f64,
    pub data_access_status: DataAccessStatus,
    pub data_access_issues: Vec<String>,
    pub files_reviewed: BTreeSet<String>,
    pub summary: String,
    pub overall_score: u8,
    pub auto_approve: bool,
    pub congratulations_message: String,
    pub final_decision: Recommendation,
    pub critical_blockers: Vec<String>,
    pub important_improvements: Vec<String>,
    pub optional_suggestions: Vec<String>,
    pub inline_comments: Vec<InlineComment>,
    pub specialist_reviews: Vec<SpecialistPayload>,
    pub rationale: String,
    pub next_steps: Vec<String>,
}

impl ReviewReport {
    pub fn total_findings(&self) -> usize {
        self.specialist_reviews.iter().map(|r| r.findings.len()).sum()
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// A present flag is false when it is `false`, `null`, zero, empty, or a
/// string spelling a negative.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "" | "false" | "no" | "0"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

/// Accepts integers, floats and numeric strings.
fn as_u64_lenient(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn score_field(value: &Value, key: &str) -> u8 {
    value
        .get(key)
        .and_then(as_u64_lenient)
        .map(|s| s.min(10) as u8)
        .unwrap_or(0)
}

fn string_list(value: &Value, key: &str) -> Option<Vec<String>> {
    let items = value.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
    )
}

fn object_list<T>(value: &Value, key: &str, convert: fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(convert).collect())
        .unwrap_or_default()
}
