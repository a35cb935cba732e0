//! Reviewer role definitions and instruction rendering.
//!
//! Five specialist roles review the PR independently; the tech lead
//! synthesizes their outputs. Instructions are plain templates: they pin the
//! mandatory tool sequence, the failure payload and the exact output schema.

use crate::agent::tools::{TOOL_GET_FILE_CONTENTS, TOOL_GET_PULL_REQUEST, TOOL_GET_PULL_REQUEST_FILES};
use crate::models::ReviewRequest;

/// A specialist persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewerRole {
    /// Agent name, e.g. `SecurityEngineer`.
    pub name: &'static str,
    /// Human role title, e.g. `Security Engineer`.
    pub title: &'static str,
    pub focus_areas: &'static [&'static str],
}

impl ReviewerRole {
    /// Session slot this role writes to, e.g. `securityengineer_review`.
    pub fn output_key(&self) -> String {
        format!("{}_review", self.name.to_lowercase())
    }

    pub fn description(&self) -> String {
        let focus: Vec<&str> = self.focus_areas.iter().take(2).copied().collect();
        format!("{} - Reviews PRs for {}", self.title, focus.join(", "))
    }
}

pub const PRODUCT_OWNER: ReviewerRole = ReviewerRole {
    name: "ProductOwner",
    title: "Product Owner",
    focus_areas: &[
        "PR alignment with linked issues",
        "Acceptance criteria validation",
        "Business value verification",
        "Breaking changes impact",
    ],
};

pub const SENIOR_ENGINEER: ReviewerRole = ReviewerRole {
    name: "SeniorEngineer",
    title: "Senior Software Engineer",
    focus_areas: &[
        "Code quality and readability",
        "Architecture and design patterns",
        "Performance implications",
        "Error handling and edge cases",
    ],
};

pub const SECURITY_ENGINEER: ReviewerRole = ReviewerRole {
    name: "SecurityEngineer",
    title: "Security Engineer",
    focus_areas: &[
        "Security vulnerabilities (OWASP Top 10)",
        "Authentication/authorization",
        "Input validation",
        "Secrets exposure",
    ],
};

pub const DEVOPS_ENGINEER: ReviewerRole = ReviewerRole {
    name: "DevOpsEngineer",
    title: "DevOps Engineer",
    focus_areas: &[
        "CI/CD configuration",
        "Infrastructure as Code",
        "Deployment risks",
        "Monitoring and logging",
    ],
};

pub const QA_ENGINEER: ReviewerRole = ReviewerRole {
    name: "QAEngineer",
    title: "QA Engineer",
    focus_areas: &[
        "Test coverage",
        "Test quality",
        "Edge cases",
        "Regression risks",
    ],
};

/// The fixed specialist panel, in display order.
pub const SPECIALISTS: [ReviewerRole; 5] = [
    PRODUCT_OWNER,
    SENIOR_ENGINEER,
    SECURITY_ENGINEER,
    DEVOPS_ENGINEER,
    QA_ENGINEER,
];

/// Name of the synthesizing agent.
pub const TECH_LEAD_NAME: &str = "TechLead";

/// Session slot for the synthesis output.
pub const TECH_LEAD_OUTPUT_KEY: &str = "tech_lead_synthesis";

/// Kick-off message sent as the first user turn of every agent.
pub fn kickoff_message(request: &ReviewRequest) -> String {
    format!(
        "Review PR #{} in {}",
        request.pr_number,
        request.full_name()
    )
}

/// Render the full instruction for a specialist.
pub fn render_specialist_instruction(role: &ReviewerRole, request: &ReviewRequest) -> String {
    let focus_list = role
        .focus_areas
        .iter()
        .map(|area| format!("- {}", area))
        .collect::<Vec<_>>()
        .join("\n");

    let name = role.name;
    let title = role.title;
    let owner = &request.owner;
    let repo = &request.repository;
    let pr_number = request.pr_number;

    format!(
        r#"You are a {title} reviewing PR #{pr_number} in repository {owner}/{repo}.

**MANDATORY: You MUST use these tools BEFORE writing any review:**

Step 1 - Get PR info:
Call tool `{TOOL_GET_PULL_REQUEST}` with parameters:
- owner: "{owner}"
- repo: "{repo}"
- pull_number: {pr_number}

Step 2 - Get changed files:
Call tool `{TOOL_GET_PULL_REQUEST_FILES}` with parameters:
- owner: "{owner}"
- repo: "{repo}"
- pull_number: {pr_number}

Step 3 - For each file, get the content:
Call tool `{TOOL_GET_FILE_CONTENTS}` with:
- owner: "{owner}"
- repo: "{repo}"
- path: "<file_path_from_step_2>"

**STOP! If you cannot execute these tools or they return errors, you MUST respond:**
```json
{{
  "agent_name": "{name}",
  "agent_role": "{title}",
  "pr_accessed": false,
  "error": "Could not access PR data - tool call failed",
  "files_in_diff": [],
  "findings": [],
  "recommendation": "COMMENT"
}}
```

**Your Focus Areas:**
{focus_list}

**After successfully getting PR data, output this JSON:**
```json
{{
  "agent_name": "{name}",
  "agent_role": "{title}",
  "pr_accessed": true,
  "repository": "{owner}/{repo}",
  "pr_number": {pr_number},
  "files_in_diff": ["exact file paths from {TOOL_GET_PULL_REQUEST_FILES} response"],
  "summary": "Summary based on ACTUAL file contents you retrieved",
  "score": 1-10,
  "findings": [
    {{
      "severity": "CRITICAL|HIGH|MEDIUM|LOW",
      "category": "Category",
      "file": "path/from/{TOOL_GET_PULL_REQUEST_FILES}",
      "line": 42,
      "issue": "Issue found in the ACTUAL code you retrieved",
      "current_code": "actual code from {TOOL_GET_FILE_CONTENTS}",
      "suggested_code": "improved code",
      "recommendation": "How to fix"
    }}
  ],
  "recommendation": "APPROVE|REQUEST_CHANGES|COMMENT",
  "rationale": "Based on actual code review"
}}
```

**Rules:**
- files_in_diff MUST contain the exact paths from {TOOL_GET_PULL_REQUEST_FILES}
- If files_in_diff is empty, you did NOT use the tools correctly
- If you find NO issues, recommend APPROVE with empty findings
- Every finding MUST reference actual code you retrieved
- Output exactly one JSON object as your final answer"#
    )
}

/// Render the tech lead instruction, embedding every specialist's raw output.
///
/// `outputs` pairs each role with what it produced; `None` marks a role that
/// produced nothing.
pub fn render_synthesis_instruction(
    request: &ReviewRequest,
    outputs: &[(ReviewerRole, Option<String>)],
) -> String {
    let owner = &request.owner;
    let repo = &request.repository;
    let pr_number = request.pr_number;

    let keys = outputs
        .iter()
        .map(|(role, _)| format!("- {}", role.output_key()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut reviews = String::new();
    for (role, output) in outputs {
        reviews.push_str(&format!("### {} ({})\n", role.output_key(), role.title));
        match output.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                reviews.push_str(text);
                reviews.push('\n');
            }
            _ => reviews.push_str("<no output: this specialist failed to produce a review>\n"),
        }
        reviews.push('\n');
    }

    format!(
        r#"You are a Tech Lead synthesizing reviews for PR #{pr_number} in {owner}/{repo}.

**Your Task:**
Read all specialist reviews below:
{keys}

**CRITICAL: Check if specialists actually accessed PR data:**
- Look for "pr_accessed": true in each review
- Look for non-empty "files_in_diff" arrays
- If any specialist has "pr_accessed": false, empty files_in_diff or no output, note this as data_access_status: "partial_failure"

**DECISION LOGIC:**
1. If ALL specialists have empty findings AND pr_accessed=true → auto_approve = true, final_decision = "APPROVE"
2. If any specialist has CRITICAL findings → auto_approve = false, final_decision = "REQUEST_CHANGES"
3. If findings exist but none are CRITICAL → auto_approve = false, final_decision = "COMMENT"
4. If specialists couldn't access data (pr_accessed=false) → auto_approve = false

**Output JSON:**
```json
{{
  "repository": "{owner}/{repo}",
  "pr_number": {pr_number},
  "summary": "Executive summary",
  "overall_score": 1-10,
  "auto_approve": true,
  "congratulations_message": "🎉 Excellent work! Clean code, no issues found. Keep it up! 🚀✨",
  "data_access_status": "all_success|partial_failure|all_failed",
  "files_reviewed": ["list of files from specialist reviews"],
  "critical_blockers": [],
  "important_improvements": [],
  "optional_suggestions": [],
  "inline_comments": [
    {{
      "path": "file/path",
      "line": 42,
      "side": "RIGHT",
      "body": "**🔴 CRITICAL**\n\nIssue description\n\n**Current:**\n```\nbad_code()\n```\n\n**Fix:**\n```\ngood_code()\n```\n\n*— AgentName*"
    }}
  ],
  "specialist_reviews": [
    {{
      "agent": "AgentName",
      "role": "Role",
      "pr_accessed": true,
      "files_reviewed": ["files"],
      "score": 8,
      "recommendation": "APPROVE",
      "findings_count": 0,
      "key_findings": []
    }}
  ],
  "final_decision": "APPROVE|REQUEST_CHANGES|COMMENT",
  "rationale": "Explanation",
  "next_steps": []
}}
```

**If auto_approve is true:**
- congratulations_message should be celebratory with emojis
- inline_comments should be empty
- Celebrate the PR author's good work!

## Specialist Reviews

{reviews}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReviewRequest {
        ReviewRequest::new("acme", "widgets", 7)
    }

    #[test]
    fn test_five_distinct_specialists() {
        let mut keys: Vec<String> = SPECIALISTS.iter().map(|r| r.output_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 5);
        assert!(keys.contains(&"securityengineer_review".to_string()));
    }

    #[test]
    fn test_specialist_instruction_contains_schema_fields() {
        let text = render_specialist_instruction(&SECURITY_ENGINEER, &request());

        for field in [
            "agent_name",
            "pr_accessed",
            "files_in_diff",
            "findings",
            "recommendation",
        ] {
            assert!(text.contains(field), "missing field {}", field);
        }
        assert!(text.contains("You are a Security Engineer reviewing PR #7 in repository acme/widgets"));
        assert!(text.contains("- Secrets exposure"));
        assert!(text.contains("CRITICAL|HIGH|MEDIUM|LOW"));
        assert!(text.contains("APPROVE|REQUEST_CHANGES|COMMENT"));
    }

    #[test]
    fn test_specialist_instruction_names_tool_sequence() {
        let text = render_specialist_instruction(&QA_ENGINEER, &request());
        let pr = text.find(TOOL_GET_PULL_REQUEST).unwrap();
        let files = text.find(TOOL_GET_PULL_REQUEST_FILES).unwrap();
        let contents = text.find(TOOL_GET_FILE_CONTENTS).unwrap();
        assert!(pr <= files && files < contents);
        assert!(text.contains("\"pr_accessed\": false"));
    }

    #[test]
    fn test_synthesis_instruction_embeds_outputs() {
        let outputs = vec![
            (PRODUCT_OWNER, Some("{\"pr_accessed\": true}".to_string())),
            (QA_ENGINEER, None),
        ];
        let text = render_synthesis_instruction(&request(), &outputs);

        assert!(text.contains("- productowner_review"));
        assert!(text.contains("### qaengineer_review (QA Engineer)"));
        assert!(text.contains("{\"pr_accessed\": true}"));
        assert!(text.contains("<no output"));
        assert!(text.contains("final_decision"));
    }

    #[test]
    fn test_role_description() {
        assert_eq!(
            DEVOPS_ENGINEER.description(),
            "DevOps Engineer - Reviews PRs for CI/CD configuration, Infrastructure as Code"
        );
    }
}
