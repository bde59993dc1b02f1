//! `suggest_permanent_config`: render a monitoring config fragment as YAML
//! for `infrastructure.yml`.

use relicbot_core::error::ToolError;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde_json::{Value, json};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::PermanentConfig.name().into(),
        description: "Generate permanent monitoring configuration for infrastructure.yml \
                      (alerts, SLOs, dashboards)"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "config": {
                    "type": "object",
                    "description": "Monitoring configuration to add (alerts, dashboards, SLOs)"
                },
                "rationale": {
                    "type": "string",
                    "description": "Explanation of why these monitors are needed"
                }
            },
            "required": ["config"]
        }),
    }
}

pub fn execute(input: &Value) -> Result<Value, ToolError> {
    let config = input
        .get("config")
        .filter(|c| !c.is_null())
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'config' argument".into()))?;
    let rationale = input.get("rationale").and_then(Value::as_str).unwrap_or_default();

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to render config YAML: {e}")))?;

    Ok(json!({
        "success": true,
        "config": yaml,
        "rationale": rationale,
        "instructions": "Add this configuration to your infrastructure.yml file",
    }))
}
