//! Instruction context for the model: the monitored application's name and
//! the project's instruction document.

use std::path::Path;

use relicbot_config::AppConfig;
use relicbot_core::scm::SourceControl;
use tracing::{debug, info, warn};

/// Name used when nothing better can be determined.
pub const DEFAULT_APP_NAME: &str = "Unknown Application";

const CONTEXT_FILES: [&str; 2] = ["context.md", "claude.md"];
const PLACEHOLDERS: [&str; 2] = ["{{APP_NAME}}", "{{app_name}}"];

const CONTEXT_TRAILER: &str = "\
You have access to various tools to analyze the pull request and generate observability configurations.
Always follow the platform configuration format provided in the context above.

Your responses should be clear, actionable, and formatted for GitHub markdown.
";

const DEFAULT_CONTEXT: &str = "\
You are a NewRelic observability expert. Analyze code changes to {{APP_NAME}} and generate appropriate monitoring.

Follow these principles:
- Temporary dashboards for PR monitoring (rollout phase)
- Permanent charts and alerts for long-term observability
- Keep configurations slim and maintainable
- Focus on actionable metrics
";

/// Where the deployed application's name is recorded in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppNameSource {
    /// YAML file path relative to the repository root
    pub file: String,
    /// Dotted path to the name inside the document
    pub field: String,
}

impl Default for AppNameSource {
    fn default() -> Self {
        Self {
            file: ".deploy/production.yml".into(),
            field: "newrelic.app_name".into(),
        }
    }
}

impl From<&AppConfig> for AppNameSource {
    fn from(config: &AppConfig) -> Self {
        Self {
            file: config.app_name_file.clone(),
            field: config.app_name_field.clone(),
        }
    }
}

/// Determine the application name for NRQL queries.
///
/// A readable deploy config wins. A config that is missing, unparseable or
/// lacks the field falls back to a name derived from the repository slug.
/// Any other failure yields [`DEFAULT_APP_NAME`].
pub async fn resolve_app_name(scm: &dyn SourceControl, source: &AppNameSource) -> String {
    match scm.file_contents(&source.file).await {
        Ok(file) => match field_from_yaml(&file.content, &source.field) {
            Some(name) => {
                info!(app_name = %name, file = %source.file, "Resolved app name from deploy config");
                name
            }
            None => {
                warn!(
                    file = %source.file,
                    field = %source.field,
                    "App name field missing from deploy config, deriving from repository"
                );
                name_from_slug(scm.repository())
            }
        },
        Err(e) if e.is_not_found() => {
            debug!(file = %source.file, "No deploy config, deriving app name from repository");
            name_from_slug(scm.repository())
        }
        Err(e) => {
            warn!(error = %e, "Failed to read deploy config, using default app name");
            DEFAULT_APP_NAME.into()
        }
    }
}

fn field_from_yaml(content: &str, dotted: &str) -> Option<String> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content).ok()?;
    let value = dotted
        .split('.')
        .try_fold(&doc, |node, key| node.get(key))?;

    let name = match value {
        serde_yaml::Value::String(s) => s.trim().to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!name.is_empty()).then_some(name)
}

/// `acme/payment-service` becomes `Payment Service`.
fn name_from_slug(slug: &str) -> String {
    let last = slug.rsplit('/').next().unwrap_or(slug);
    let words: Vec<String> = last
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();

    if words.is_empty() {
        DEFAULT_APP_NAME.into()
    } else {
        words.join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Load the instruction document from `dir` (`context.md`, then
/// `claude.md`) with the app name substituted. Falls back to a built-in
/// instruction when neither exists.
pub fn load_context(dir: &Path, app_name: &str) -> String {
    let found = CONTEXT_FILES.iter().find_map(|name| {
        let path = dir.join(name);
        std::fs::read_to_string(&path).ok().map(|content| (path, content))
    });

    let text = match found {
        Some((path, content)) => {
            info!(path = %path.display(), "Loaded context document");
            format!("{}\n\n{CONTEXT_TRAILER}", content.trim_end())
        }
        None => {
            warn!(dir = %dir.display(), "context.md or claude.md not found, using minimal context");
            DEFAULT_CONTEXT.to_string()
        }
    };

    PLACEHOLDERS
        .iter()
        .fold(text, |acc, placeholder| acc.replace(placeholder, app_name))
}
