//! `learn_from_existing_dashboards`: look at the account's dashboards to
//! find what kinds of monitoring already exist and what is missing.

use std::sync::LazyLock;

use regex_lite::Regex;
use relicbot_core::error::{MetricsError, ToolError};
use relicbot_core::metrics::Entity;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{ToolContext, required_str};

const DASHBOARDS: &str = "domain = 'VIZ' AND type = 'DASHBOARD'";
const DASHBOARDS_SHOWN: usize = 5;
const GENERIC_NAME_HINTS: [&str; 3] = ["api", "service", "application"];

fn category(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("category pattern is valid")
}

static ERROR: LazyLock<Regex> = LazyLock::new(|| category("error|exception|failure"));
static PERFORMANCE: LazyLock<Regex> = LazyLock::new(|| category("performance|latency|response"));
static BUSINESS: LazyLock<Regex> =
    LazyLock::new(|| category("business|revenue|conversion|user"));
static INFRASTRUCTURE: LazyLock<Regex> =
    LazyLock::new(|| category("infra|system|resource|health"));
static API: LazyLock<Regex> = LazyLock::new(|| category("api|endpoint|request"));

#[derive(Debug, Default, Serialize)]
struct CommonPatterns {
    has_error_monitoring: bool,
    has_performance_monitoring: bool,
    has_business_metrics: bool,
    has_infrastructure: bool,
    has_api_monitoring: bool,
    total_dashboard_count: usize,
}

impl CommonPatterns {
    fn from_dashboards(dashboards: &[&Entity]) -> Self {
        let any = |re: &Regex| dashboards.iter().any(|d| re.is_match(&d.name));
        Self {
            has_error_monitoring: any(&*ERROR),
            has_performance_monitoring: any(&*PERFORMANCE),
            has_business_metrics: any(&*BUSINESS),
            has_infrastructure: any(&*INFRASTRUCTURE),
            has_api_monitoring: any(&*API),
            total_dashboard_count: dashboards.len(),
        }
    }

    fn style_recommendations(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.has_error_monitoring {
            out.push("Follow existing error monitoring patterns");
        }
        if self.has_performance_monitoring {
            out.push("Match existing performance dashboard style");
        }
        if self.has_business_metrics {
            out.push("Include business impact metrics (user-facing)");
        }
        if self.has_infrastructure {
            out.push("Add infrastructure health checks");
        }
        if self.has_api_monitoring {
            out.push("Use API-centric dashboard layout");
        }
        if out.is_empty() {
            out.push("Establish baseline dashboard standards");
        }
        out
    }

    /// API coverage is not treated as a gap.
    fn gaps(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.has_error_monitoring {
            out.push("No error monitoring found - HIGH PRIORITY to add");
        }
        if !self.has_performance_monitoring {
            out.push("No performance monitoring - add latency tracking");
        }
        if !self.has_business_metrics {
            out.push("Missing business metrics - consider adding user impact");
        }
        if !self.has_infrastructure {
            out.push("No infrastructure monitoring - add health checks");
        }
        if out.is_empty() {
            out.push("Monitoring coverage looks good!");
        }
        out
    }
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::Dashboards.name().into(),
        description: "Analyze existing NewRelic dashboards to learn monitoring patterns and \
                      avoid duplicates"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "app_name": {
                    "type": "string",
                    "description": "Application name to find related dashboards"
                }
            },
            "required": ["app_name"]
        }),
    }
}

pub async fn execute(ctx: &ToolContext, input: &Value) -> Result<Value, ToolError> {
    let app_name = required_str(input, "app_name")?;

    let entities = match ctx.metrics.entity_search(DASHBOARDS).await {
        Ok(entities) => entities,
        Err(MetricsError::Api { status, .. }) => {
            return Ok(json!({
                "success": false,
                "error": format!("Failed to fetch dashboards: {status}"),
                "default_action": "Use standard monitoring patterns from documentation",
            }));
        }
        Err(e) => {
            return Ok(json!({
                "success": false,
                "error": format!("Failed to learn from dashboards: {e}"),
                "default_action": "Proceed with standard monitoring recommendations",
            }));
        }
    };

    let relevant = relevant_dashboards(app_name, &entities);
    let patterns = CommonPatterns::from_dashboards(&relevant);

    Ok(json!({
        "success": true,
        "total_dashboards_found": relevant.len(),
        "dashboards": relevant
            .iter()
            .take(DASHBOARDS_SHOWN)
            .map(|d| json!({ "name": d.name, "guid": d.guid }))
            .collect::<Vec<_>>(),
        "style_recommendations": patterns.style_recommendations(),
        "gaps_identified": patterns.gaps(),
        "common_patterns": patterns,
    }))
}

/// Dashboards named after the app, or with a generic service-ish name.
fn relevant_dashboards<'a>(app_name: &str, entities: &'a [Entity]) -> Vec<&'a Entity> {
    let app = app_name.to_lowercase();
    entities
        .iter()
        .filter(|d| {
            let name = d.name.to_lowercase();
            name.contains(&app) || GENERIC_NAME_HINTS.iter().any(|hint| name.contains(hint))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relicbot_core::testing::{FakeMetrics, FakeScm, entity};
    use std::sync::Arc;

    fn ctx(metrics: FakeMetrics) -> ToolContext {
        ToolContext {
            scm: Arc::new(FakeScm::new("acme/checkout")),
            metrics: Arc::new(metrics),
            pr_number: 1,
            default_account_id: None,
        }
    }

    fn dashboards(names: &[&str]) -> FakeMetrics {
        FakeMetrics::default().with_entities(
            DASHBOARDS,
            Ok(names
                .iter()
                .enumerate()
                .map(|(i, n)| entity(n, &format!("D{i}"), None))
                .collect()),
        )
    }

    #[tokio::test]
    async fn only_relevant_dashboards_are_counted() {
        let metrics = dashboards(&[
            "Checkout Errors",
            "Marketing Funnel",
            "Payments API Latency",
            "Team Lunch Poll",
        ]);
        let out = execute(&ctx(metrics), &json!({"app_name": "checkout"}))
            .await
            .unwrap();

        assert_eq!(out["success"], true);
        assert_eq!(out["total_dashboards_found"], 2);
        assert_eq!(out["dashboards"][0]["name"], "Checkout Errors");
        assert_eq!(out["dashboards"][1]["guid"], "D2");

        let patterns = &out["common_patterns"];
        assert_eq!(patterns["has_error_monitoring"], true);
        assert_eq!(patterns["has_performance_monitoring"], true);
        assert_eq!(patterns["has_api_monitoring"], true);
        assert_eq!(patterns["has_business_metrics"], false);
        assert_eq!(patterns["total_dashboard_count"], 2);
    }

    #[tokio::test]
    async fn gaps_and_style_follow_categories() {
        let metrics = dashboards(&["Checkout Errors"]);
        let out = execute(&ctx(metrics), &json!({"app_name": "checkout"}))
            .await
            .unwrap();
        assert_eq!(
            out["style_recommendations"],
            json!(["Follow existing error monitoring patterns"])
        );
        assert_eq!(
            out["gaps_identified"],
            json!([
                "No performance monitoring - add latency tracking",
                "Missing business metrics - consider adding user impact",
                "No infrastructure monitoring - add health checks"
            ])
        );
    }

    #[tokio::test]
    async fn empty_account_gets_baseline_advice() {
        let out = execute(&ctx(dashboards(&[])), &json!({"app_name": "checkout"}))
            .await
            .unwrap();
        assert_eq!(out["total_dashboards_found"], 0);
        assert_eq!(
            out["style_recommendations"],
            json!(["Establish baseline dashboard standards"])
        );
        assert_eq!(out["gaps_identified"].as_array().unwrap().len(), 4);
        assert_eq!(out["gaps_identified"][0], "No error monitoring found - HIGH PRIORITY to add");
    }

    #[tokio::test]
    async fn full_coverage_reports_no_gaps() {
        let metrics = dashboards(&[
            "checkout exceptions",
            "checkout latency",
            "checkout revenue",
            "checkout system health",
        ]);
        let out = execute(&ctx(metrics), &json!({"app_name": "Checkout"}))
            .await
            .unwrap();
        assert_eq!(out["gaps_identified"], json!(["Monitoring coverage looks good!"]));
    }

    #[tokio::test]
    async fn at_most_five_dashboards_listed() {
        let names: Vec<String> = (0..8).map(|i| format!("checkout board {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let out = execute(&ctx(dashboards(&refs)), &json!({"app_name": "checkout"}))
            .await
            .unwrap();
        assert_eq!(out["total_dashboards_found"], 8);
        assert_eq!(out["dashboards"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn api_failure_reports_status() {
        let metrics = FakeMetrics::default().with_entities(
            DASHBOARDS,
            Err(MetricsError::Api {
                status: 500,
                body: "oops".into(),
            }),
        );
        let out = execute(&ctx(metrics), &json!({"app_name": "checkout"}))
            .await
            .unwrap();
        assert_eq!(out["error"], "Failed to fetch dashboards: 500");
        assert_eq!(
            out["default_action"],
            "Use standard monitoring patterns from documentation"
        );
    }

    #[tokio::test]
    async fn other_failures_fall_back_to_standard_advice() {
        let metrics = FakeMetrics::default().with_entities(
            DASHBOARDS,
            Err(MetricsError::GraphQl("unauthorized".into())),
        );
        let out = execute(&ctx(metrics), &json!({"app_name": "checkout"}))
            .await
            .unwrap();
        assert_eq!(
            out["error"],
            "Failed to learn from dashboards: NerdGraph query failed: unauthorized"
        );
        assert_eq!(
            out["default_action"],
            "Proceed with standard monitoring recommendations"
        );
    }

    #[tokio::test]
    async fn app_name_is_required() {
        let err = execute(&ctx(dashboards(&[])), &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
