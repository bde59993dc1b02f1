//! `create_temp_dashboard_files`: render a short-lived dashboard as a YAML
//! reference file plus an NRQL listing, for the author to commit.

use relicbot_core::error::ToolError;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{optional_str, required_str};

const DEFAULT_DESCRIPTION: &str = "Monitoring for PR changes";
const EXPIRES_AFTER: &str = "7_days";
const REFERENCE_HEADER: &str =
    "# Temporary dashboard for PR monitoring\n# Auto-expires 7 days after merge\n";

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    title: String,
    nrql: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct TempDashboard<'a> {
    name: &'a str,
    queries_file: &'a str,
    expires_after: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct ReferenceFile<'a> {
    temp_dashboards: Vec<TempDashboard<'a>>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::TempDashboard.name().into(),
        description: "Generate temporary dashboard files for monitoring PR changes. Creates \
                      reference YAML and NRQL queries file."
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "dashboard_name": {
                    "type": "string",
                    "description": "Name for the temporary dashboard (e.g., \"pr-123-payment-refactor\")"
                },
                "queries": {
                    "type": "array",
                    "description": "Array of NRQL queries with titles",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "nrql": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["title", "nrql"]
                    }
                },
                "description": {
                    "type": "string",
                    "description": "Description of what this dashboard monitors"
                }
            },
            "required": ["dashboard_name", "queries"]
        }),
    }
}

pub fn execute(input: &Value) -> Result<Value, ToolError> {
    let name = required_str(input, "dashboard_name")?;
    let description = optional_str(input, "description").unwrap_or(DEFAULT_DESCRIPTION);
    let queries: Vec<DashboardQuery> = input
        .get("queries")
        .cloned()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'queries' argument".into()))
        .and_then(|q| {
            serde_json::from_value(q)
                .map_err(|e| ToolError::InvalidArguments(format!("Invalid 'queries': {e}")))
        })?;

    let reference_path = format!("temp/{name}.yml");
    let queries_path = format!("temp/{name}-queries.nrql");

    let reference = ReferenceFile {
        temp_dashboards: vec![TempDashboard {
            name,
            queries_file: &queries_path,
            expires_after: EXPIRES_AFTER,
            description,
        }],
    };
    let yaml = serde_yaml::to_string(&reference)
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to render dashboard YAML: {e}")))?;

    Ok(json!({
        "success": true,
        "files": {
            "reference_file": {
                "path": reference_path,
                "content": format!("{REFERENCE_HEADER}{yaml}"),
            },
            "queries_file": {
                "path": queries_path,
                "content": render_queries(&queries),
            },
        },
        "instructions": "Add these files to your repository and reference them in infrastructure.yml",
    }))
}

fn render_queries(queries: &[DashboardQuery]) -> String {
    queries
        .iter()
        .enumerate()
        .map(|(i, q)| {
            format!(
                "-- Query {}: {}\n-- {}\n{}\n",
                i + 1,
                q.title,
                q.description.as_deref().unwrap_or("No description"),
                q.nrql
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
