//! GitHub REST client.
//!
//! Implements [`SourceControl`] against the v3 REST API, scoped to one
//! repository. Authentication is a bearer token (the workflow's
//! `GITHUB_TOKEN` or a PAT).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use relicbot_core::error::ScmError;
use relicbot_core::scm::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const FILES_PER_PAGE: u32 = 100;
/// GitHub stops listing PR files after 3000 entries.
const MAX_FILE_PAGES: u32 = 30;

/// GitHub REST API client bound to a single `owner/name` repository.
pub struct GitHubClient {
    repository: String,
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(repository: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at GitHub Enterprise Server or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client (shared timeout, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.repository, path)
    }

    /// Contents URL with each path segment percent-encoded, so `#`, `?`
    /// and `%` in file names stay part of the path.
    fn contents_url(&self, path: &str) -> Result<reqwest::Url, ScmError> {
        let mut url = reqwest::Url::parse(&self.repo_url("contents"))
            .map_err(|e| ScmError::Network(format!("invalid GitHub API URL: {e}")))?;
        let url_display = url.to_string();
        url.path_segments_mut()
            .map_err(|()| ScmError::Network(format!("GitHub API URL cannot take a path: {url_display}")))?
            .extend(path.split('/'));
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(
                "User-Agent",
                concat!("relicbot/", env!("CARGO_PKG_VERSION")),
            )
    }

    /// Send a request and decode the JSON body, mapping HTTP failures.
    async fn send<T: DeserializeOwned>(
        &self,
        what: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ScmError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ScmError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScmError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), what, "GitHub API error");
            return Err(ScmError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ScmError::Decode(format!("{what}: {e}")))
    }
}

/// Prefer GitHub's `{"message": ...}`, then the raw body, then the reason phrase.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }

    if let Ok(err) = serde_json::from_str::<ApiError>(body) {
        return err.message;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status.canonical_reason().unwrap_or("Unknown error").to_string()
}

/// Decode a contents-API payload. Base64 content arrives wrapped at 60 columns.
///
/// Files over 1 MB come back with encoding `none` and no content.
fn decode_content(encoding: &str, raw: &str) -> Result<String, ScmError> {
    match encoding {
        "none" => Err(ScmError::Decode(
            "file too large for the contents API".into(),
        )),
        "base64" => {
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| ScmError::Decode(format!("invalid base64 content: {e}")))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Ok(raw.to_string()),
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    fn repository(&self) -> &str {
        &self.repository
    }

    async fn pull_request(&self, number: u64) -> Result<PrInfo, ScmError> {
        debug!(repo = %self.repository, number, "Fetching pull request");
        let url = self.repo_url(&format!("pulls/{number}"));
        self.send(&format!("pull request #{number}"), self.request(reqwest::Method::GET, &url))
            .await
    }

    async fn pull_request_files(&self, number: u64) -> Result<Vec<PrFile>, ScmError> {
        let url = self.repo_url(&format!("pulls/{number}/files"));
        let mut files = Vec::new();

        for page in 1..=MAX_FILE_PAGES {
            let builder = self
                .request(reqwest::Method::GET, &url)
                .query(&[("per_page", FILES_PER_PAGE), ("page", page)]);
            let batch: Vec<PrFile> = self
                .send(&format!("files of pull request #{number}"), builder)
                .await?;
            let done = batch.len() < FILES_PER_PAGE as usize;
            files.extend(batch);
            if done {
                break;
            }
        }

        debug!(number, files = files.len(), "Fetched pull request files");
        Ok(files)
    }

    async fn file_contents(&self, path: &str) -> Result<FileContent, ScmError> {
        let path = path.trim_start_matches('/');
        let url = self.contents_url(path)?;
        let raw: ContentsResponse = self
            .send(path, self.request(reqwest::Method::GET, url.as_str()))
            .await?;

        let content = decode_content(&raw.encoding, &raw.content)?;
        Ok(FileContent {
            path: raw.path,
            size: raw.size,
            encoding: raw.encoding,
            content,
        })
    }

    async fn search_code(&self, query: &str, per_page: u32) -> Result<CodeSearchResult, ScmError> {
        let url = format!("{}/search/code", self.base_url);
        let per_page = per_page.to_string();
        let builder = self
            .request(reqwest::Method::GET, &url)
            .query(&[("q", query), ("per_page", per_page.as_str())]);
        let raw: SearchResponse = self.send("code search", builder).await?;

        Ok(CodeSearchResult {
            total_count: raw.total_count,
            items: raw
                .items
                .into_iter()
                .map(|item| CodeSearchHit {
                    path: item.path,
                    html_url: item.html_url,
                    repository: item.repository.full_name,
                })
                .collect(),
        })
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), ScmError> {
        let url = self.repo_url(&format!("issues/{number}/comments"));
        let builder = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({ "body": body }));
        let created: CommentResponse = self
            .send(&format!("comments of #{number}"), builder)
            .await?;
        debug!(number, comment_id = created.id, "Posted comment");
        Ok(())
    }
}

// --- GitHub API types ---

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    encoding: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    path: String,
    html_url: String,
    repository: SearchRepository,
}

#[derive(Debug, Deserialize)]
struct SearchRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: u64,
}
