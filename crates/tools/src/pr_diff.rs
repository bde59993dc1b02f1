//! `get_pr_diff`: every changed file of the PR with its patch.

use relicbot_core::error::ToolError;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde_json::{Value, json};

use crate::ToolContext;

const NO_PATCH: &str = "Binary file or no changes";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::PrDiff.name().into(),
        description: "Get the full diff of PR changes to understand what code was added, \
                      modified, or removed"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
    }
}

pub async fn execute(ctx: &ToolContext) -> Result<Value, ToolError> {
    let files = ctx
        .scm
        .pull_request_files(ctx.pr_number)
        .await
        .map_err(|e| ToolError::scm("Failed to fetch PR diff", e))?;

    let entries: Vec<Value> = files
        .iter()
        .map(|f| {
            json!({
                "filename": f.filename,
                "status": f.status,
                "additions": f.additions,
                "deletions": f.deletions,
                "changes": f.changes,
                "patch": f.patch.as_deref().unwrap_or(NO_PATCH),
            })
        })
        .collect();

    Ok(json!({
        "total_files": entries.len(),
        "files": entries,
    }))
}
