//! The observability tools RelicBot exposes to the model.
//!
//! Each tool lives in its own module with a `definition()` (name,
//! description, JSON schema) and an `execute()` returning
//! `Result<Value, ToolError>`. [`ToolRegistry`] dispatches by [`ToolKind`]
//! and turns every failure into an `{"error": ...}` value, so nothing a
//! tool does can abort the conversation.

pub mod analyze_file;
pub mod app_name;
pub mod dashboards;
pub mod dependent_code;
pub mod existing_config;
pub mod log_statements;
pub mod permanent_config;
pub mod pr_diff;
pub mod query_metrics;
pub mod temp_dashboard;

use std::sync::Arc;

use async_trait::async_trait;
use relicbot_core::error::ToolError;
use relicbot_core::metrics::MetricsBackend;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::scm::SourceControl;
use relicbot_core::tool::{ToolExecutor, ToolKind};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// What handlers can reach: the PR's repository, the metrics backend, and
/// the run's fixed inputs.
pub struct ToolContext {
    pub scm: Arc<dyn SourceControl>,
    pub metrics: Arc<dyn MetricsBackend>,
    pub pr_number: u64,
    /// Account used for NRQL when the model does not name one
    pub default_account_id: Option<String>,
}

impl ToolContext {
    /// Last path segment of the `owner/name` slug.
    pub fn repo_name(&self) -> &str {
        let repo = self.scm.repository();
        repo.rsplit('/').next().unwrap_or(repo)
    }
}

/// Dispatches tool calls to their handlers.
pub struct ToolRegistry {
    ctx: ToolContext,
}

impl ToolRegistry {
    pub fn new(
        scm: Arc<dyn SourceControl>,
        metrics: Arc<dyn MetricsBackend>,
        pr_number: u64,
    ) -> Self {
        Self {
            ctx: ToolContext {
                scm,
                metrics,
                pr_number,
                default_account_id: None,
            },
        }
    }

    pub fn with_default_account(mut self, account_id: Option<String>) -> Self {
        self.ctx.default_account_id = account_id;
        self
    }

    pub fn definition(kind: ToolKind) -> ToolDefinition {
        match kind {
            ToolKind::AppName => app_name::definition(),
            ToolKind::PrDiff => pr_diff::definition(),
            ToolKind::AnalyzeFile => analyze_file::definition(),
            ToolKind::LogStatements => log_statements::definition(),
            ToolKind::DependentCode => dependent_code::definition(),
            ToolKind::Dashboards => dashboards::definition(),
            ToolKind::QueryMetrics => query_metrics::definition(),
            ToolKind::ExistingConfig => existing_config::definition(),
            ToolKind::TempDashboard => temp_dashboard::definition(),
            ToolKind::PermanentConfig => permanent_config::definition(),
        }
    }

    async fn dispatch(&self, kind: ToolKind, input: &Value) -> Result<Value, ToolError> {
        let ctx = &self.ctx;
        match kind {
            ToolKind::AppName => app_name::execute(ctx, input).await,
            ToolKind::PrDiff => pr_diff::execute(ctx).await,
            ToolKind::AnalyzeFile => analyze_file::execute(ctx, input).await,
            ToolKind::LogStatements => log_statements::execute(input),
            ToolKind::DependentCode => dependent_code::execute(ctx, input).await,
            ToolKind::Dashboards => dashboards::execute(ctx, input).await,
            ToolKind::QueryMetrics => query_metrics::execute(ctx, input).await,
            ToolKind::ExistingConfig => existing_config::execute(ctx, input).await,
            ToolKind::TempDashboard => temp_dashboard::execute(input),
            ToolKind::PermanentConfig => permanent_config::execute(input),
        }
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        ToolKind::ALL.into_iter().map(Self::definition).collect()
    }

    async fn execute(&self, name: &str, input: Value) -> Value {
        let Some(kind) = ToolKind::from_name(name) else {
            warn!(tool = %name, "Model requested unknown tool");
            return json!({ "error": format!("Unknown tool: {name}") });
        };

        debug!(tool = %kind, "Dispatching tool");
        match self.dispatch(kind, &input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %kind, error = %e, "Tool failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}

/// A required, non-empty string argument.
pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// An optional string argument; empty strings count as absent.
pub(crate) fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
