//! `analyze_file`: read one file from the repository's default branch.

use relicbot_core::error::ToolError;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde_json::{Value, json};

use crate::{ToolContext, required_str};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::AnalyzeFile.name().into(),
        description: "Read and analyze a specific file from the repository to understand its \
                      current state"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "Path to file relative to repository root (e.g., \"app/controllers/users_controller.rb\")"
                }
            },
            "required": ["filepath"]
        }),
    }
}

pub async fn execute(ctx: &ToolContext, input: &Value) -> Result<Value, ToolError> {
    let filepath = required_str(input, "filepath")?;

    match ctx.scm.file_contents(filepath).await {
        Ok(file) => Ok(json!({
            "filepath": filepath,
            "size": file.size,
            "content": file.content,
            "encoding": file.encoding,
        })),
        Err(e) if e.is_not_found() => Ok(json!({ "error": format!("File not found: {filepath}") })),
        Err(e) => Err(ToolError::scm("Failed to read file", e)),
    }
}
