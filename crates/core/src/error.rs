//! Error types for the RelicBot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum. [`Error`] covers what can abort
//! a run: the model call and the repository host. Tool and metrics failures
//! stay inside the tool registry.

use thiserror::Error;

/// The top-level error type for a RelicBot run.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Source control errors ---
    #[error("GitHub error: {0}")]
    Scm(#[from] ScmError),
}

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures talking to the repository host.
///
/// `NotFound` is kept apart from every other failure so callers can turn a
/// missing file into a clean "not found" answer.
#[derive(Debug, Clone, Error)]
pub enum ScmError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode GitHub response: {0}")]
    Decode(String),
}

impl ScmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScmError::NotFound(_))
    }

    /// HTTP status of the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ScmError::NotFound(_) => Some(404),
            ScmError::Api { status, .. } => Some(*status),
            ScmError::Network(_) | ScmError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    #[error("NewRelic API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("NerdGraph query failed: {0}")]
    GraphQl(String),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Failed to decode NewRelic response: {0}")]
    Decode(String),
}

/// Failures inside a tool handler. These never leave the tool registry:
/// they are rendered as `{"error": ...}` and handed back to the model.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("{context}: {source}")]
    Scm {
        context: String,
        #[source]
        source: ScmError,
    },

    #[error("{context}: {source}")]
    Metrics {
        context: String,
        #[source]
        source: MetricsError,
    },

    #[error("{0}")]
    ExecutionFailed(String),
}

impl ToolError {
    pub fn scm(context: impl Into<String>, source: ScmError) -> Self {
        ToolError::Scm {
            context: context.into(),
            source,
        }
    }

    pub fn metrics(context: impl Into<String>, source: MetricsError) -> Self {
        ToolError::Metrics {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_errors_name_their_source() {
        let err = Error::from(ScmError::NotFound("pull request #12".into()));
        assert_eq!(err.to_string(), "GitHub error: Not found: pull request #12");
        let err = Error::from(ProviderError::AuthenticationFailed("Invalid Anthropic API key".into()));
        assert_eq!(
            err.to_string(),
            "Provider error: Authentication failed: Invalid Anthropic API key"
        );
    }

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 529,
            message: "Overloaded".into(),
        });
        assert!(err.to_string().contains("529"));
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn scm_not_found_is_distinguished() {
        let missing = ScmError::NotFound("infrastructure.yml".into());
        let outage = ScmError::Network("connection reset".into());
        assert!(missing.is_not_found());
        assert!(!outage.is_not_found());
        assert_eq!(missing.status(), Some(404));
        assert_eq!(outage.status(), None);
    }

    #[test]
    fn tool_error_carries_context() {
        let err = ToolError::scm(
            "Failed to fetch PR diff",
            ScmError::Api {
                status: 502,
                message: "Bad Gateway".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "Failed to fetch PR diff: GitHub API error 502: Bad Gateway"
        );
    }

    #[test]
    fn metrics_error_includes_status_and_body() {
        let err = MetricsError::Api {
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "NewRelic API error: 403 - forbidden");
    }
}
