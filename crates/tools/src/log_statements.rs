//! `analyze_log_statements`: find error/warn/info log calls in a snippet
//! and turn error and warn messages into log-based alert suggestions.
//!
//! A line-oriented heuristic: for each severity only the first matching
//! pattern on a line is recorded, and only quoted literal messages are
//! recognized.

use std::sync::LazyLock;

use regex_lite::Regex;
use relicbot_core::error::ToolError;
use relicbot_core::provider::ToolDefinition;
use relicbot_core::tool::ToolKind;
use serde::Serialize;
use serde_json::{Value, json};

const ALERT_NAME_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    const ALL: [Severity; 3] = [Severity::Error, Severity::Warn, Severity::Info];

    fn label(self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warn => "Warn",
            Severity::Info => "Info",
        }
    }

    /// Occurrences per 5 minutes before the suggested alert fires.
    fn alert_threshold(self) -> Option<u32> {
        match self {
            Severity::Error => Some(5),
            Severity::Warn => Some(20),
            Severity::Info => None,
        }
    }

    fn patterns(self) -> &'static [Regex] {
        match self {
            Severity::Error => &ERROR_PATTERNS,
            Severity::Warn => &WARN_PATTERNS,
            Severity::Info => &INFO_PATTERNS,
        }
    }
}

fn logger_call(method: &str) -> Regex {
    Regex::new(&format!(
        r#"(?:logger|Rails\.logger|log|console)\.{method}\s*\(?\s*["']([^"']*)["']"#
    ))
    .expect("log pattern is valid")
}

static ERROR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        logger_call("error"),
        Regex::new(r#"raise\s+\w+Error[,\s]+\(?\s*["']([^"']*)["']"#).expect("raise pattern is valid"),
    ]
});
static WARN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| vec![logger_call("warn")]);
static INFO_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| vec![logger_call("info")]);

#[derive(Debug, Serialize)]
struct LogFinding {
    line_number: usize,
    message: String,
    context: String,
    severity: Severity,
}

#[derive(Debug, Serialize)]
struct SuggestedAlert {
    name: String,
    query: String,
    threshold: u32,
}

#[derive(Debug, Serialize)]
struct Recommendation {
    log_message: String,
    severity: Severity,
    suggested_alert: SuggestedAlert,
}

#[derive(Debug, Default, Serialize)]
struct LogReport {
    error_logs: Vec<LogFinding>,
    warn_logs: Vec<LogFinding>,
    info_logs: Vec<LogFinding>,
    monitoring_recommendations: Vec<Recommendation>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::LogStatements.name().into(),
        description: "Extract and analyze all log statements (error, warn, info) from code \
                      changes to suggest log-based monitoring"
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "file_content": {
                    "type": "string",
                    "description": "File content or code snippet to analyze for log statements"
                }
            },
            "required": ["file_content"]
        }),
    }
}

pub fn execute(input: &Value) -> Result<Value, ToolError> {
    // An emptied file is a valid snippet with nothing in it.
    let content = input
        .get("file_content")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_content' argument".into()))?;
    let report = scan(content);

    let summary = json!({
        "total_errors": report.error_logs.len(),
        "total_warnings": report.warn_logs.len(),
        "total_info": report.info_logs.len(),
        "requires_monitoring": !report.error_logs.is_empty() || !report.warn_logs.is_empty(),
    });

    let mut out = serde_json::to_value(&report)
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to analyze log statements: {e}")))?;
    out["summary"] = summary;
    Ok(out)
}

fn scan(content: &str) -> LogReport {
    let mut report = LogReport::default();

    for (idx, line) in content.lines().enumerate() {
        for severity in Severity::ALL {
            let Some(message) = severity
                .patterns()
                .iter()
                .find_map(|re| re.captures(line))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            else {
                continue;
            };

            if let Some(threshold) = severity.alert_threshold() {
                report.monitoring_recommendations.push(Recommendation {
                    log_message: message.clone(),
                    severity,
                    suggested_alert: SuggestedAlert {
                        name: format!(
                            "{}: {}",
                            severity.label(),
                            message.chars().take(ALERT_NAME_CHARS).collect::<String>()
                        ),
                        query: format!(
                            "SELECT count(*) FROM Log WHERE message LIKE '%{}%' SINCE 5 minutes ago",
                            message.replace('\'', "''")
                        ),
                        threshold,
                    },
                });
            }

            let finding = LogFinding {
                line_number: idx + 1,
                message,
                context: line.trim().to_string(),
                severity,
            };
            match severity {
                Severity::Error => report.error_logs.push(finding),
                Severity::Warn => report.warn_logs.push(finding),
                Severity::Info => report.info_logs.push(finding),
            }
        }
    }

    report
}
