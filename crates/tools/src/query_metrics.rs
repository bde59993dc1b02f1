//! `query_newrelic`: run a model-written NRQL query.

use relicbot_core::error::{MetricsError, ToolError};
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde_json::{Value, json};
use tracing::debug;

use crate::{ToolContext, optional_str, required_str};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::QueryMetrics.name().into(),
        description: "Query NewRelic using NRQL to check existing metrics, alerts, or \
                      performance baselines"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "nrql": {
                    "type": "string",
                    "description": "NRQL query to execute (e.g., \"SELECT count(*) FROM Transaction WHERE appName = 'MyApp' SINCE 1 day ago\")"
                },
                "account_id": {
                    "type": "string",
                    "description": "NewRelic account ID (optional, uses the configured account if not provided)"
                }
            },
            "required": ["nrql"]
        }),
    }
}

pub async fn execute(ctx: &ToolContext, input: &Value) -> Result<Value, ToolError> {
    let nrql = required_str(input, "nrql")?;
    let account_id = optional_str(input, "account_id").or(ctx.default_account_id.as_deref());

    debug!(%nrql, account = ?account_id, "Running NRQL");
    match ctx.metrics.nrql(nrql, account_id).await {
        Ok(body) => Ok(body),
        Err(e @ MetricsError::Api { .. }) => Ok(json!({ "error": e.to_string() })),
        Err(e) => Err(ToolError::metrics("Failed to query NewRelic", e)),
    }
}
