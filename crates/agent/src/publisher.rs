//! Posting the analysis back to the pull request.

use relicbot_core::error::ScmError;
use relicbot_core::message::Conversation;
use relicbot_core::scm::SourceControl;
use tracing::info;

pub const ANALYSIS_HEADER: &str = "🤖 **NewRelic AI Agent - Observability Analysis**\n\n";

const NO_TEXT: &str = "Analysis complete.";

/// Text of the last assistant message that has any.
pub fn final_text(conversation: &Conversation) -> &str {
    conversation
        .messages
        .iter()
        .rev()
        .find(|m| m.has_assistant_text())
        .map_or(NO_TEXT, |m| m.content.as_str())
}

/// Post the final analysis as a single PR comment and return its body.
pub async fn publish(
    scm: &dyn SourceControl,
    pr_number: u64,
    conversation: &Conversation,
) -> Result<String, ScmError> {
    let body = format!("{ANALYSIS_HEADER}{}", final_text(conversation));
    info!(pr = pr_number, "Posting results to PR");
    scm.create_comment(pr_number, &body).await?;
    Ok(body)
}
