//! `get_newrelic_app_name`: find the APM application reporting for this
//! repository.

use relicbot_core::error::{MetricsError, ToolError};
use relicbot_core::metrics::Entity;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde_json::{Value, json};

use crate::{ToolContext, optional_str};

const APM_APPLICATIONS: &str = "domain = 'APM' AND type = 'APPLICATION'";
const AVAILABLE_APPS_SHOWN: usize = 10;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::AppName.name().into(),
        description: "Detect the correct NewRelic application name for this repository. \
                      MUST be called FIRST before any NRQL queries."
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "repo_name": {
                    "type": "string",
                    "description": "Repository name to search for (optional, uses current repo if not provided)"
                }
            },
            "required": []
        }),
    }
}

pub async fn execute(ctx: &ToolContext, input: &Value) -> Result<Value, ToolError> {
    let repo_name = optional_str(input, "repo_name").unwrap_or_else(|| ctx.repo_name());

    match ctx.metrics.entity_search(APM_APPLICATIONS).await {
        Ok(entities) => Ok(match_application(repo_name, &entities)),
        Err(MetricsError::Api { status, body }) => Ok(json!({
            "success": false,
            "error": format!("NewRelic API error: {status}"),
            "details": serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body)),
        })),
        Err(e) => Err(ToolError::metrics("Failed to detect app name", e)),
    }
}

/// Exact (case-insensitive) name match first, then a unique substring match.
fn match_application(repo_name: &str, entities: &[Entity]) -> Value {
    let needle = repo_name.to_lowercase();

    if let Some(exact) = entities.iter().find(|e| e.name.to_lowercase() == needle) {
        return json!({
            "success": true,
            "app_name": exact.name,
            "guid": exact.guid,
            "application_id": exact.application_id,
            "match_type": "exact",
        });
    }

    let fuzzy: Vec<&Entity> = entities
        .iter()
        .filter(|e| e.name.to_lowercase().contains(&needle))
        .collect();

    match fuzzy.as_slice() {
        [only] => json!({
            "success": true,
            "app_name": only.name,
            "guid": only.guid,
            "application_id": only.application_id,
            "match_type": "fuzzy",
            "confidence": "high",
        }),
        [] => json!({
            "success": false,
            "error": "No matching application found in NewRelic",
            "searched_for": repo_name,
            "available_apps": entities
                .iter()
                .take(AVAILABLE_APPS_SHOWN)
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>(),
            "message": "The repository name doesn't match any NewRelic application. \
                        Check if the app is reporting to NewRelic or use a different search term.",
        }),
        several => json!({
            "success": false,
            "error": "Multiple matches found",
            "suggestions": several.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            "message": "Please manually specify which app to monitor. \
                        Add app name to repository description or use most relevant match.",
        }),
    }
}
