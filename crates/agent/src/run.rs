//! One analysis run for one pull request.

use std::path::PathBuf;
use std::sync::Arc;

use relicbot_config::AppConfig;
use relicbot_core::error::{Error, ScmError};
use relicbot_core::message::{Conversation, Message};
use relicbot_core::scm::SourceControl;
use tracing::{error, info};

use crate::context::{AppNameSource, load_context, resolve_app_name};
use crate::loop_runner::{ConversationDriver, DriveSummary};
use crate::prompt::build_initial_prompt;
use crate::publisher::publish;

/// PRs with fewer changed lines than this are not analyzed.
pub const SMALL_PR_THRESHOLD: u64 = 50;

const NOTICE_HEADER: &str = "🤖 **NewRelic AI Agent**\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The PR was below the size threshold; a notice was posted.
    SkippedSmallPr { changes: u64 },
    /// The analysis was posted.
    Published(DriveSummary),
    /// The analysis failed; an error comment was posted.
    Failed { message: String },
}

pub struct Agent {
    scm: Arc<dyn SourceControl>,
    driver: ConversationDriver,
    pr_number: u64,
    context_dir: PathBuf,
    app_name_source: AppNameSource,
}

impl Agent {
    pub fn new(scm: Arc<dyn SourceControl>, driver: ConversationDriver, pr_number: u64) -> Self {
        Self {
            scm,
            driver,
            pr_number,
            context_dir: PathBuf::from("."),
            app_name_source: AppNameSource::default(),
        }
    }

    /// Context directory and app-name source taken from `config`.
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.with_context_dir(config.context_dir.clone())
            .with_app_name_source(AppNameSource::from(config))
    }

    pub fn with_context_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.context_dir = dir.into();
        self
    }

    pub fn with_app_name_source(mut self, source: AppNameSource) -> Self {
        self.app_name_source = source;
        self
    }

    /// Analyze the PR and post exactly one comment.
    ///
    /// Any failure during the analysis is reported as an error comment and
    /// yields [`RunOutcome::Failed`]. `Err` is returned only when that
    /// comment cannot be posted either.
    pub async fn run(&self) -> Result<RunOutcome, ScmError> {
        info!(
            repo = %self.scm.repository(),
            pr = self.pr_number,
            "Starting NewRelic AI Agent"
        );

        match self.analyze().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "Analysis failed");
                post_failure(self.scm.as_ref(), self.pr_number, &message).await?;
                Ok(RunOutcome::Failed { message })
            }
        }
    }

    async fn analyze(&self) -> Result<RunOutcome, Error> {
        let pr = self.scm.pull_request(self.pr_number).await?;
        let changes = pr.changes();
        info!(pr = pr.number, title = %pr.title, "Analyzing PR");
        info!(changes, files = pr.changed_files, "PR size");

        if changes < SMALL_PR_THRESHOLD {
            info!(changes, threshold = SMALL_PR_THRESHOLD, "PR too small, skipping");
            self.scm
                .create_comment(self.pr_number, &small_pr_notice(changes))
                .await?;
            return Ok(RunOutcome::SkippedSmallPr { changes });
        }

        let app_name = resolve_app_name(self.scm.as_ref(), &self.app_name_source).await;
        let system = load_context(&self.context_dir, &app_name);
        let prompt = build_initial_prompt(&pr, &app_name, &self.driver.tools().definitions());

        let mut conversation = Conversation::new();
        conversation.push(Message::system(system));
        conversation.push(Message::user(prompt));

        let summary = self.driver.drive(&mut conversation).await?;
        info!(
            model_calls = summary.model_calls,
            tool_calls = summary.tool_calls,
            completion = ?summary.completion,
            "Analysis complete"
        );

        publish(self.scm.as_ref(), self.pr_number, &conversation).await?;
        info!(pr = self.pr_number, "Comment posted");
        Ok(RunOutcome::Published(summary))
    }
}

fn small_pr_notice(changes: u64) -> String {
    format!(
        "{NOTICE_HEADER}PR is too small ({changes} lines changed) to warrant observability \
         suggestions. No action needed."
    )
}

/// Post the error notice for a run that could not complete.
pub async fn post_failure(
    scm: &dyn SourceControl,
    pr_number: u64,
    message: &str,
) -> Result<(), ScmError> {
    let body = format!("{NOTICE_HEADER}❌ Error occurred during analysis: {message}");
    scm.create_comment(pr_number, &body).await
}
