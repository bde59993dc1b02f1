//! `find_dependent_code`: search the repository for callers of a class or
//! method and grade how widely a failure would spread.

use relicbot_core::error::ToolError;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde_json::{Value, json};
use tracing::debug;

use crate::{ToolContext, optional_str, required_str};

const SEARCH_PAGE_SIZE: u32 = 20;
const DEPENDENCIES_SHOWN: usize = 10;

/// Blast radius of a change, graded by reference count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    pub fn from_references(count: u64) -> Self {
        match count {
            0..=5 => ImpactLevel::Low,
            6..=15 => ImpactLevel::Medium,
            16..=50 => ImpactLevel::High,
            _ => ImpactLevel::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImpactLevel::Low => "Low",
            ImpactLevel::Medium => "Medium",
            ImpactLevel::High => "High",
            ImpactLevel::Critical => "Critical",
        }
    }

    pub fn assessment(self) -> &'static str {
        match self {
            ImpactLevel::Low => {
                "Low - Few dependencies, localized impact. Basic monitoring sufficient."
            }
            ImpactLevel::Medium => {
                "Medium - Moderate dependencies. Watch for cascade failures. Implement alert chains."
            }
            ImpactLevel::High => {
                "High - Many dependencies. Critical to monitor end-to-end flow. Need comprehensive dashboards."
            }
            ImpactLevel::Critical => {
                "Critical - Heavily used component. Failure will cascade widely. Requires SLO tracking and multi-level alerts."
            }
        }
    }

    pub fn priority(self) -> &'static str {
        match self {
            ImpactLevel::Critical | ImpactLevel::High => "P0 - Must have monitoring before merge",
            ImpactLevel::Medium => "P1 - Should have monitoring in same sprint",
            ImpactLevel::Low => "P2 - Nice to have, can be added incrementally",
        }
    }
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::DependentCode.name().into(),
        description: "Find code that depends on or calls the modified methods/classes to \
                      understand impact scope"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "class_name": {
                    "type": "string",
                    "description": "Class name to search for references (e.g., \"UserController\", \"PaymentService\")"
                },
                "method_name": {
                    "type": "string",
                    "description": "Method name to search for (optional, e.g., \"create\", \"process_payment\")"
                }
            },
            "required": ["class_name"]
        }),
    }
}

pub async fn execute(ctx: &ToolContext, input: &Value) -> Result<Value, ToolError> {
    let class_name = required_str(input, "class_name")?;
    let method_name = optional_str(input, "method_name");
    let repo = ctx.scm.repository();

    let (query, target) = match method_name {
        Some(m) => (
            format!("{class_name}.{m} OR {class_name}::{m} repo:{repo}"),
            format!("{class_name}.{m}"),
        ),
        None => (format!("{class_name} repo:{repo}"), class_name.to_string()),
    };

    debug!(%query, "Searching for dependent code");
    let results = match ctx.scm.search_code(&query, SEARCH_PAGE_SIZE).await {
        Ok(results) => results,
        Err(e) if e.status() == Some(422) => {
            return Ok(json!({
                "success": false,
                "error": "GitHub code search failed - may be too many results or rate limited",
                "message": "Assume HIGH impact and implement comprehensive monitoring",
                "default_monitoring": [
                    "End-to-end transaction success rate",
                    "Error monitoring with detailed breakdown",
                    "Performance monitoring across all callers"
                ]
            }));
        }
        Err(e) => {
            return Ok(json!({
                "success": false,
                "error": format!("Failed to find dependencies: {e}"),
                "default_action": "Implement monitoring assuming medium-high impact"
            }));
        }
    };

    let dependencies: Vec<Value> = results
        .items
        .iter()
        .take(DEPENDENCIES_SHOWN)
        .map(|hit| {
            json!({
                "file": hit.path,
                "url": hit.html_url,
                "repository": hit.repository,
            })
        })
        .collect();

    let impact = ImpactLevel::from_references(results.total_count);

    Ok(json!({
        "success": true,
        "searched_for": target,
        "total_references": results.total_count,
        "dependencies": dependencies,
        "impact_level": impact.label(),
        "impact_assessment": impact.assessment(),
        "monitoring_priority": impact.priority(),
        "recommended_monitors": [
            format!("Success rate of {target}"),
            "Response time percentiles",
            "Error rate by caller"
        ]
    }))
}
