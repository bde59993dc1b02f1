//! In-memory collaborators shared by the tool and agent tests.
//!
//! Enabled inside this crate's own tests and, for downstream crates, through
//! the `test-support` feature in their dev-dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{MetricsError, ScmError};
use crate::metrics::{Entity, MetricsBackend};
use crate::scm::*;

/// In-memory repository. Unknown paths are `NotFound`; posted comments are
/// recorded.
pub struct FakeScm {
    repo: String,
    pr: Result<PrInfo, ScmError>,
    pr_files: Result<Vec<PrFile>, ScmError>,
    files: HashMap<String, Result<FileContent, ScmError>>,
    search: Result<CodeSearchResult, ScmError>,
    comment_error: Option<ScmError>,
    pub searches: Mutex<Vec<(String, u32)>>,
    pub comments: Mutex<Vec<(u64, String)>>,
}

impl FakeScm {
    pub fn new(repo: &str) -> Self {
        Self {
            repo: repo.into(),
            pr: Ok(pr_info(12, 150, 50)),
            pr_files: Ok(Vec::new()),
            files: HashMap::new(),
            search: Ok(CodeSearchResult {
                total_count: 0,
                items: Vec::new(),
            }),
            comment_error: None,
            searches: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pr(mut self, pr: Result<PrInfo, ScmError>) -> Self {
        self.pr = pr;
        self
    }

    pub fn with_pr_files(mut self, files: Result<Vec<PrFile>, ScmError>) -> Self {
        self.pr_files = files;
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(
            path.into(),
            Ok(FileContent {
                path: path.into(),
                size: content.len() as u64,
                encoding: "base64".into(),
                content: content.into(),
            }),
        );
        self
    }

    pub fn with_file_error(mut self, path: &str, err: ScmError) -> Self {
        self.files.insert(path.into(), Err(err));
        self
    }

    pub fn with_search(mut self, result: Result<CodeSearchResult, ScmError>) -> Self {
        self.search = result;
        self
    }

    pub fn with_comment_error(mut self, err: ScmError) -> Self {
        self.comment_error = Some(err);
        self
    }

    /// Bodies of the posted comments, in order.
    pub fn posted(&self) -> Vec<String> {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl SourceControl for FakeScm {
    fn repository(&self) -> &str {
        &self.repo
    }

    async fn pull_request(&self, _number: u64) -> Result<PrInfo, ScmError> {
        self.pr.clone()
    }

    async fn pull_request_files(&self, _number: u64) -> Result<Vec<PrFile>, ScmError> {
        self.pr_files.clone()
    }

    async fn file_contents(&self, path: &str) -> Result<FileContent, ScmError> {
        self.files
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(ScmError::NotFound(path.into())))
    }

    async fn search_code(&self, query: &str, per_page: u32) -> Result<CodeSearchResult, ScmError> {
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), per_page));
        self.search.clone()
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), ScmError> {
        if let Some(err) = &self.comment_error {
            return Err(err.clone());
        }
        self.comments
            .lock()
            .unwrap()
            .push((number, body.to_string()));
        Ok(())
    }
}

/// In-memory metrics backend. Entity searches answer per query string;
/// NRQL returns one canned result and records every query.
#[derive(Default)]
pub struct FakeMetrics {
    entities: HashMap<String, Result<Vec<Entity>, MetricsError>>,
    nrql: Option<Result<Value, MetricsError>>,
    pub queries: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeMetrics {
    pub fn with_entities(mut self, query: &str, result: Result<Vec<Entity>, MetricsError>) -> Self {
        self.entities.insert(query.into(), result);
        self
    }

    pub fn with_nrql(mut self, result: Result<Value, MetricsError>) -> Self {
        self.nrql = Some(result);
        self
    }
}

#[async_trait]
impl MetricsBackend for FakeMetrics {
    async fn nrql(&self, query: &str, account_id: Option<&str>) -> Result<Value, MetricsError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), account_id.map(str::to_string)));
        self.nrql
            .clone()
            .unwrap_or_else(|| Ok(serde_json::json!({"data": {"actor": {"nrql": {"results": []}}}})))
    }

    async fn entity_search(&self, query: &str) -> Result<Vec<Entity>, MetricsError> {
        self.entities.get(query).cloned().unwrap_or(Ok(Vec::new()))
    }
}

pub fn entity(name: &str, guid: &str, application_id: Option<u64>) -> Entity {
    Entity {
        name: name.into(),
        guid: guid.into(),
        domain: None,
        application_id,
    }
}

pub fn pr_info(number: u64, additions: u64, deletions: u64) -> PrInfo {
    PrInfo {
        number,
        title: "Refactor payment retries".into(),
        additions,
        deletions,
        changed_files: 4,
        body: "Moves retry logic into PaymentService.".into(),
    }
}
