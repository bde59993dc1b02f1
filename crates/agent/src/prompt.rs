//! The opening user message of every analysis.

use std::fmt::Write;

use relicbot_core::provider::ToolDefinition;
use relicbot_core::scm::PrInfo;

use crate::run::SMALL_PR_THRESHOLD;

/// Build the initial prompt: objectives, PR facts, the application name to
/// use in NRQL, the available tools and the decision rules.
pub fn build_initial_prompt(pr: &PrInfo, app_name: &str, tools: &[ToolDefinition]) -> String {
    let mut prompt = format!(
        "You are a NewRelic observability expert analyzing a pull request. \
Your task is to determine what observability is needed.

## Application Information:
- **Application Name**: {app_name}
- **IMPORTANT**: Use \"appName = '{app_name}'\" in all NRQL queries

## Your Objectives:

1. **Temporary Dashboard** (for monitoring this PR during release):
   - Evaluate if this PR needs temporary monitoring (threshold: >{SMALL_PR_THRESHOLD} lines changed)
   - If yes, generate NRQL queries for key metrics during rollout
   - Create separate queries file to keep infrastructure.yml slim

2. **Permanent Observability** (long-term charts/alerts):
   - Identify what new permanent charts should be added
   - Determine what alerts should be configured
   - Follow the infrastructure.yml format from context

## PR Information:
- **Number**: #{number}
- **Title**: {title}
- **Changes**: {changes} lines
- **Files Changed**: {files}
",
        number = pr.number,
        title = pr.title,
        changes = pr.changes(),
        files = pr.changed_files,
    );

    let description = pr.body.trim();
    if !description.is_empty() {
        let _ = write!(prompt, "- **Description**:\n{description}\n");
    }

    prompt.push_str("\n## Available Tools:\nUse these tools to complete your analysis:\n");
    for (i, tool) in tools.iter().enumerate() {
        let _ = writeln!(prompt, "{}. `{}` - {}", i + 1, tool.name, tool.description);
    }

    let _ = write!(
        prompt,
        "
## Decision Rules:
- Small changes (<{SMALL_PR_THRESHOLD} lines): No temporary dashboard needed
- New endpoints/APIs: Need both temporary and permanent monitoring
- Database changes: Monitor query performance
- Background jobs: Monitor success rates and timing
- Critical paths: Set up SLO alerts

Start by fetching the PR diff and analyzing the changes.
"
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::pr_info;
    use serde_json::json;

    fn tools() -> Vec<ToolDefinition> {
        ["get_newrelic_app_name", "get_pr_diff"]
            .into_iter()
            .map(|name| ToolDefinition {
                name: name.into(),
                description: format!("{name} description"),
                parameters: json!({"type": "object", "properties": {}, "required": []}),
            })
            .collect()
    }

    #[test]
    fn includes_pr_facts_and_app_name() {
        let prompt = build_initial_prompt(&pr_info(42, 120, 30), "Payments", &tools());
        assert!(prompt.contains("- **Number**: #42"));
        assert!(prompt.contains("- **Title**: Refactor payment retries"));
        assert!(prompt.contains("- **Changes**: 150 lines"));
        assert!(prompt.contains("- **Files Changed**: 4"));
        assert!(prompt.contains("Use \"appName = 'Payments'\" in all NRQL queries"));
        assert!(prompt.contains("Moves retry logic into PaymentService."));
    }

    #[test]
    fn lists_tools_in_registry_order() {
        let prompt = build_initial_prompt(&pr_info(1, 60, 0), "Ledger", &tools());
        let first = prompt
            .find("1. `get_newrelic_app_name` - get_newrelic_app_name description")
            .unwrap();
        let second = prompt.find("2. `get_pr_diff` - get_pr_diff description").unwrap();
        assert!(first < second);
    }

    #[test]
    fn threshold_appears_in_rules() {
        let prompt = build_initial_prompt(&pr_info(1, 60, 0), "Ledger", &[]);
        assert!(prompt.contains("(threshold: >50 lines changed)"));
        assert!(prompt.contains("Small changes (<50 lines)"));
        assert!(prompt.trim_end().ends_with("analyzing the changes."));
    }

    #[test]
    fn empty_description_is_omitted() {
        let mut pr = pr_info(1, 60, 0);
        pr.body = "  \n".into();
        let prompt = build_initial_prompt(&pr, "Ledger", &[]);
        assert!(!prompt.contains("**Description**"));
    }
}
