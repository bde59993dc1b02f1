//! Configuration loading, validation, and trigger inputs for RelicBot.
//!
//! Two sources:
//! - [`AppConfig`]: optional `relicbot.toml` (or the file named by
//!   `RELICBOT_CONFIG`) with environment variable overrides.
//! - [`TriggerEnv`]: the CI trigger inputs (repository, PR number,
//!   credentials), read once at startup and never mutated.
//!
//! Both take an environment lookup function so tests never touch the
//! process environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "relicbot.toml";

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Model-call ceiling of the conservative profile.
pub const CONSERVATIVE_MAX_ITERATIONS: u32 = 10;
/// Model-call ceiling of the extended profile.
pub const EXTENDED_MAX_ITERATIONS: u32 = 15;

const MAX_ITERATIONS_LIMIT: u32 = 50;

/// Which model vendor to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-sonnet-4-5-20250929",
            ProviderKind::OpenAi => "gpt-4-turbo-preview",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Some(ProviderKind::Anthropic),
            "openai" | "openai-compatible" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => f.write_str("anthropic"),
            ProviderKind::OpenAi => f.write_str("openai"),
        }
    }
}

/// Iteration ceiling preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationProfile {
    #[default]
    Conservative,
    Extended,
}

impl IterationProfile {
    pub fn max_iterations(self) -> u32 {
        match self {
            IterationProfile::Conservative => CONSERVATIVE_MAX_ITERATIONS,
            IterationProfile::Extended => EXTENDED_MAX_ITERATIONS,
        }
    }
}

/// The root configuration structure. Maps directly to `relicbot.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model vendor
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model override; defaults per provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Iteration ceiling preset
    #[serde(default)]
    pub profile: IterationProfile,

    /// Explicit ceiling; wins over `profile`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    /// Directory holding `context.md` / `claude.md`
    #[serde(default = "default_context_dir")]
    pub context_dir: PathBuf,

    /// Repository path of the YAML file that names the New Relic app
    #[serde(default = "default_app_name_file")]
    pub app_name_file: String,

    /// Dotted path of the app name inside `app_name_file`
    #[serde(default = "default_app_name_field")]
    pub app_name_field: String,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    #[serde(default = "default_newrelic_api_url")]
    pub newrelic_api_url: String,

    /// Anthropic base URL override (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_api_url: Option<String>,

    /// OpenAI-compatible base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_url: Option<String>,

    /// Per-request HTTP timeout for every client
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_context_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_app_name_file() -> String {
    ".deploy/production.yml".into()
}
fn default_app_name_field() -> String {
    "newrelic.app_name".into()
}
fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.into()
}
fn default_newrelic_api_url() -> String {
    "https://api.newrelic.com/graphql".into()
}
fn default_http_timeout_secs() -> u64 {
    120
}

impl AppConfig {
    /// Load from `RELICBOT_CONFIG` or `./relicbot.toml`, then apply the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let path = env("RELICBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        Self::load_with(&path, env)
    }

    /// Load from `path` and apply overrides from `env`.
    ///
    /// - `RELICBOT_PROVIDER`: "anthropic" or "openai"
    /// - `RELICBOT_MODEL`
    /// - `RELICBOT_MAX_ITERATIONS`
    /// - `GITHUB_API_URL`: set by GitHub Actions on Enterprise Server
    pub fn load_with(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if let Some(provider) = non_empty(env("RELICBOT_PROVIDER")) {
            config.provider = ProviderKind::parse(&provider).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "RELICBOT_PROVIDER must be 'anthropic' or 'openai', got '{provider}'"
                ))
            })?;
        }

        if let Some(model) = non_empty(env("RELICBOT_MODEL")) {
            config.model = Some(model);
        }

        if let Some(raw) = non_empty(env("RELICBOT_MAX_ITERATIONS")) {
            let max = raw.trim().parse::<u32>().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "RELICBOT_MAX_ITERATIONS must be a positive integer, got '{raw}'"
                ))
            })?;
            config.max_iterations = Some(max);
        }

        if let Some(url) = non_empty(env("GITHUB_API_URL")) {
            config.github_api_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if let Some(max) = self.max_iterations {
            if max == 0 || max > MAX_ITERATIONS_LIMIT {
                return Err(ConfigError::ValidationError(format!(
                    "max_iterations must be between 1 and {MAX_ITERATIONS_LIMIT}"
                )));
            }
        }

        if self.app_name_field.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "app_name_field must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// The model to request, resolved against the provider default.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// The model-call ceiling for this run.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
            .unwrap_or_else(|| self.profile.max_iterations())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            profile: IterationProfile::default(),
            max_iterations: None,
            context_dir: default_context_dir(),
            app_name_file: default_app_name_file(),
            app_name_field: default_app_name_field(),
            github_api_url: default_github_api_url(),
            newrelic_api_url: default_newrelic_api_url(),
            anthropic_api_url: None,
            openai_api_url: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// CI trigger inputs.
///
/// Only the values needed to comment on the PR are mandatory here; model and
/// New Relic credentials are checked with [`TriggerEnv::missing_required`] so
/// a misconfigured run can still report itself on the PR.
#[derive(Clone)]
pub struct TriggerEnv {
    /// `owner/name`
    pub repository: String,
    pub pr_number: u64,
    pub github_token: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub newrelic_api_key: Option<String>,
    pub newrelic_account_id: Option<String>,
    /// `GITHUB_API_URL`, or github.com. Lets a run report on the PR even
    /// when the config file is unusable.
    pub github_api_url: String,
}

impl TriggerEnv {
    /// Read the trigger inputs from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let repository = non_empty(env("GITHUB_REPOSITORY"));
        let pr_number = non_empty(env("PR_NUMBER"));
        let github_token = non_empty(env("GITHUB_TOKEN"));

        let missing: Vec<&'static str> = [
            ("GITHUB_REPOSITORY", repository.is_none()),
            ("PR_NUMBER", pr_number.is_none()),
            ("GITHUB_TOKEN", github_token.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(repository), Some(pr_number), Some(github_token)) =
            (repository, pr_number, github_token)
        else {
            return Err(ConfigError::MissingEnv(missing));
        };

        if !repository.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "GITHUB_REPOSITORY must look like 'owner/name', got '{repository}'"
            )));
        }

        let pr_number = pr_number.trim().parse::<u64>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "PR_NUMBER must be a positive integer, got '{pr_number}'"
            ))
        })?;

        Ok(Self {
            repository,
            pr_number,
            github_token,
            anthropic_api_key: non_empty(env("CLAUDE_API_KEY"))
                .or_else(|| non_empty(env("ANTHROPIC_API_KEY"))),
            openai_api_key: non_empty(env("OPENAI_API_KEY")),
            newrelic_api_key: non_empty(env("NEWRELIC_API_KEY")),
            newrelic_account_id: non_empty(env("NEWRELIC_ACCOUNT_ID")),
            github_api_url: non_empty(env("GITHUB_API_URL"))
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.into()),
        })
    }

    /// The API key for the configured provider.
    pub fn model_api_key(&self, provider: ProviderKind) -> Option<&str> {
        match provider {
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
        }
    }

    /// Names of the credentials a full analysis needs but that are absent.
    pub fn missing_required(&self, provider: ProviderKind) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.model_api_key(provider).is_none() {
            missing.push(match provider {
                ProviderKind::Anthropic => "CLAUDE_API_KEY",
                ProviderKind::OpenAi => "OPENAI_API_KEY",
            });
        }
        if self.newrelic_api_key.is_none() {
            missing.push("NEWRELIC_API_KEY");
        }
        missing
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for TriggerEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerEnv")
            .field("repository", &self.repository)
            .field("pr_number", &self.pr_number)
            .field("github_token", &"[REDACTED]")
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("newrelic_api_key", &redact(&self.newrelic_api_key))
            .field("newrelic_account_id", &self.newrelic_account_id)
            .field("github_api_url", &self.github_api_url)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<&'static str>),
}
