//! GitHubClient against a local axum server shaped like the REST API.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use relicbot_core::{ScmError, SourceControl};
use relicbot_github::GitHubClient;
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Recorded {
    comments: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Vec<String>>>,
    searches: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn pull(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Path((_owner, _repo, number)): Path<(String, String, u64)>,
) -> impl IntoResponse {
    if let Some(auth) = headers.get("authorization") {
        rec.auth
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap_or_default().to_string());
    }
    if number == 404 {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "number": number,
            "title": "Add refund endpoint",
            "additions": 140,
            "deletions": 12,
            "changed_files": 3,
            "body": null,
            "state": "open"
        })),
    )
}

async fn files(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let count = if page == 1 { 100 } else { 7 };
    let files: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "filename": format!("app/file_{page}_{i}.rb"),
                "status": "modified",
                "additions": 1,
                "deletions": 0,
                "changes": 1,
                "patch": "@@ -1 +1 @@\n+puts 1"
            })
        })
        .collect();
    Json(Value::Array(files))
}

async fn contents(Path((_owner, _repo, path)): Path<(String, String, String)>) -> impl IntoResponse {
    match path.as_str() {
        ".deploy/production.yml" => (
            StatusCode::OK,
            Json(json!({
                "path": path,
                "size": 31,
                "encoding": "base64",
                "content": "bmV3cmVsaWM6\nCiAgYXBwX25h\nbWU6IGNoZWNr\nb3V0\n"
            })),
        ),
        "docs/c#.md" | "docs/what?.md" => (
            StatusCode::OK,
            Json(json!({
                "path": path,
                "size": 6,
                "encoding": "base64",
                "content": "IyBEb2NzCg=="
            })),
        ),
        "data/fixtures.json" => (
            StatusCode::OK,
            Json(json!({
                "path": path,
                "size": 2_500_000,
                "encoding": "none",
                "content": ""
            })),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))),
    }
}

async fn search(
    State(rec): State<Recorded>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let q = params.get("q").cloned().unwrap_or_default();
    rec.searches.lock().unwrap().push(params);
    if q.contains("too-broad") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"message": "Validation Failed"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [
                {"path": "app/a.rb", "html_url": "https://github.com/acme/api/blob/main/app/a.rb", "repository": {"full_name": "acme/api"}},
                {"path": "app/b.rb", "html_url": "https://github.com/acme/api/blob/main/app/b.rb", "repository": {"full_name": "acme/api"}}
            ]
        })),
    )
}

async fn comment(
    State(rec): State<Recorded>,
    Path((_owner, _repo, _number)): Path<(String, String, u64)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    rec.comments
        .lock()
        .unwrap()
        .push(body["body"].as_str().unwrap_or_default().to_string());
    (StatusCode::CREATED, Json(json!({"id": 99})))
}

async fn start() -> (GitHubClient, Recorded) {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/repos/{owner}/{repo}/pulls/{number}", get(pull))
        .route("/repos/{owner}/{repo}/pulls/{number}/files", get(files))
        .route("/repos/{owner}/{repo}/contents/{*path}", get(contents))
        .route("/repos/{owner}/{repo}/issues/{number}/comments", post(comment))
        .route("/search/code", get(search))
        .with_state(rec.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GitHubClient::new("acme/api", "ghp_test").with_base_url(format!("http://{addr}"));
    (client, rec)
}

#[tokio::test]
async fn fetches_pull_request_with_bearer_auth() {
    let (client, rec) = start().await;
    let pr = client.pull_request(12).await.unwrap();
    assert_eq!(pr.number, 12);
    assert_eq!(pr.changes(), 152);
    assert_eq!(pr.body, "");
    assert_eq!(rec.auth.lock().unwrap()[0], "Bearer ghp_test");
}

#[tokio::test]
async fn missing_pull_request_is_not_found() {
    let (client, _) = start().await;
    let err = client.pull_request(404).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn pull_request_files_follow_pages() {
    let (client, _) = start().await;
    let files = client.pull_request_files(12).await.unwrap();
    assert_eq!(files.len(), 107);
    assert_eq!(files[0].filename, "app/file_1_0.rb");
    assert_eq!(files[106].filename, "app/file_2_6.rb");
}

#[tokio::test]
async fn file_contents_are_decoded() {
    let (client, _) = start().await;
    let file = client.file_contents(".deploy/production.yml").await.unwrap();
    assert_eq!(file.encoding, "base64");
    assert_eq!(file.content, "newrelic:\n  app_name: checkout");

    let missing = client.file_contents("infrastructure.yml").await.unwrap_err();
    assert!(matches!(missing, ScmError::NotFound(_)));
}

#[tokio::test]
async fn file_paths_with_url_metacharacters_reach_the_file() {
    let (client, _) = start().await;
    for path in ["docs/c#.md", "docs/what?.md"] {
        let file = client.file_contents(path).await.unwrap();
        assert_eq!(file.path, path);
        assert_eq!(file.content, "# Docs\n");
    }
}

#[tokio::test]
async fn oversized_file_is_not_reported_as_empty() {
    let (client, _) = start().await;
    let err = client.file_contents("data/fixtures.json").await.unwrap_err();
    assert!(matches!(err, ScmError::Decode(_)));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn search_passes_query_and_page_size() {
    let (client, rec) = start().await;
    let result = client
        .search_code("PaymentProcessor repo:acme/api", 10)
        .await
        .unwrap();
    assert_eq!(result.total_count, 2);
    assert_eq!(result.items[1].repository, "acme/api");

    let searches = rec.searches.lock().unwrap();
    assert_eq!(searches[0]["q"], "PaymentProcessor repo:acme/api");
    assert_eq!(searches[0]["per_page"], "10");
}

#[tokio::test]
async fn search_validation_failure_keeps_status() {
    let (client, _) = start().await;
    let err = client.search_code("too-broad", 10).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.to_string().contains("Validation Failed"));
}

#[tokio::test]
async fn create_comment_posts_body() {
    let (client, rec) = start().await;
    client.create_comment(12, "🤖 hello").await.unwrap();
    assert_eq!(rec.comments.lock().unwrap().as_slice(), ["🤖 hello".to_string()]);
}
