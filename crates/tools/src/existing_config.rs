//! `check_existing_infrastructure`: read the repository's monitoring
//! configuration file, if there is one.

use relicbot_core::error::ToolError;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde_json::{Value, json};

use crate::{ToolContext, optional_str};

const DEFAULT_PATH: &str = "infrastructure.yml";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::ExistingConfig.name().into(),
        description: "Check if infrastructure.yml exists and read current monitoring configuration"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to infrastructure file (default: infrastructure.yml)"
                }
            },
            "required": []
        }),
    }
}

pub async fn execute(ctx: &ToolContext, input: &Value) -> Result<Value, ToolError> {
    let path = optional_str(input, "path").unwrap_or(DEFAULT_PATH);

    match ctx.scm.file_contents(path).await {
        Ok(file) => Ok(json!({
            "exists": true,
            "path": path,
            "content": file.content,
            "size": file.size,
        })),
        Err(e) if e.is_not_found() => Ok(json!({
            "exists": false,
            "path": path,
            "message": format!("{path} not found in repository root"),
        })),
        Err(e) => Err(ToolError::scm("Failed to check infrastructure file", e)),
    }
}
