//! Tool calls, tool results, and the closed set of tools the model may call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::provider::ToolDefinition;

/// A model-issued request to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID assigned by the model (`toolu_…` / `call_…`)
    pub id: String,

    /// Wire name of the tool to execute
    pub name: String,

    /// Input parameters as a JSON value
    pub input: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// The serialized output of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result answers
    pub call_id: String,

    /// JSON-serialized handler output
    pub content: String,
}

impl ToolResult {
    pub fn new(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
        }
    }
}

/// Every tool the agent exposes. Dispatch is exhaustive over this enum;
/// names outside it take the unknown-tool branch of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    AppName,
    PrDiff,
    AnalyzeFile,
    LogStatements,
    DependentCode,
    Dashboards,
    QueryMetrics,
    ExistingConfig,
    TempDashboard,
    PermanentConfig,
}

impl ToolKind {
    /// All tools, in the order they are advertised to the model.
    pub const ALL: [ToolKind; 10] = [
        ToolKind::AppName,
        ToolKind::PrDiff,
        ToolKind::AnalyzeFile,
        ToolKind::LogStatements,
        ToolKind::DependentCode,
        ToolKind::Dashboards,
        ToolKind::QueryMetrics,
        ToolKind::ExistingConfig,
        ToolKind::TempDashboard,
        ToolKind::PermanentConfig,
    ];

    /// The wire name the model uses to call this tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::AppName => "get_newrelic_app_name",
            ToolKind::PrDiff => "get_pr_diff",
            ToolKind::AnalyzeFile => "analyze_file",
            ToolKind::LogStatements => "analyze_log_statements",
            ToolKind::DependentCode => "find_dependent_code",
            ToolKind::Dashboards => "learn_from_existing_dashboards",
            ToolKind::QueryMetrics => "query_newrelic",
            ToolKind::ExistingConfig => "check_existing_infrastructure",
            ToolKind::TempDashboard => "create_temp_dashboard_files",
            ToolKind::PermanentConfig => "suggest_permanent_config",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the conversation driver needs from a tool registry.
///
/// `execute` is infallible by contract: failures come back as
/// `{"error": "..."}` values so the model can see them and adapt.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Definitions sent to the model with every request.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run the named tool and return its JSON output.
    async fn execute(&self, name: &str, input: serde_json::Value) -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(ToolKind::from_name("delete_repository"), None);
        assert_eq!(ToolKind::from_name(""), None);
    }

    #[test]
    fn wire_names_are_unique() {
        let mut names: Vec<_> = ToolKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ToolKind::ALL.len());
    }
}
