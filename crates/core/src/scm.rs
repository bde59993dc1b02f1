//! Source-control collaborator: the repository host the bot reads from and
//! comments on. Every call is scoped to the repository the run was
//! triggered for.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ScmError;

/// Immutable snapshot of the pull request under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrInfo {
    pub number: u64,
    pub title: String,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    /// PR description; empty when the author left none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

/// GitHub sends `"body": null` for PRs without a description.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PrInfo {
    /// Total changed lines (additions + deletions).
    pub fn changes(&self) -> u64 {
        self.additions + self.deletions
    }
}

/// One file of a pull request, with its unified-diff patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    /// Absent for binary files and pure renames
    #[serde(default)]
    pub patch: Option<String>,
}

/// A repository file with its content already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    pub size: u64,
    /// Encoding reported by the host (the wire encoding, e.g. "base64")
    pub encoding: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSearchHit {
    pub path: String,
    pub html_url: String,
    pub repository: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSearchResult {
    pub total_count: u64,
    pub items: Vec<CodeSearchHit>,
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// The `owner/name` slug every call is scoped to.
    fn repository(&self) -> &str;

    async fn pull_request(&self, number: u64) -> Result<PrInfo, ScmError>;

    async fn pull_request_files(&self, number: u64) -> Result<Vec<PrFile>, ScmError>;

    /// Fetch a file from the default branch. Missing files are `ScmError::NotFound`.
    async fn file_contents(&self, path: &str) -> Result<FileContent, ScmError>;

    async fn search_code(&self, query: &str, per_page: u32) -> Result<CodeSearchResult, ScmError>;

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), ScmError>;
}
