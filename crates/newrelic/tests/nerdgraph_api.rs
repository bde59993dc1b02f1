//! NerdGraphClient against a local axum server standing in for NerdGraph.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use relicbot_core::{MetricsBackend, MetricsError};
use relicbot_newrelic::NerdGraphClient;
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<Value>>>,
    keys: Arc<Mutex<Vec<String>>>,
}

async fn graphql(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let key = headers
        .get("api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    seen.keys.lock().unwrap().push(key.clone());
    seen.requests.lock().unwrap().push(body.clone());

    if key == "expired" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid key"})));
    }

    let query = body["query"].as_str().unwrap_or_default();
    if query.contains("entitySearch") {
        if body["variables"]["query"] == "broken" {
            return (
                StatusCode::OK,
                Json(json!({"data": null, "errors": [{"message": "Invalid search query"}]})),
            );
        }
        return (
            StatusCode::OK,
            Json(json!({
                "data": {"actor": {"entitySearch": {"results": {"entities": [
                    {"name": "Payment Service", "guid": "G1", "domain": "APM", "applicationId": 11},
                    {"name": "Checkout API", "guid": "G2", "domain": "APM", "applicationId": 12}
                ]}}}}
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({"data": {"actor": {"nrql": {"results": [{"count": 42}]}}}})),
    )
}

async fn start(api_key: &str) -> (NerdGraphClient, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/graphql", post(graphql))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = NerdGraphClient::new(api_key).with_endpoint(format!("http://{addr}/graphql"));
    (client, seen)
}

#[tokio::test]
async fn nrql_sends_query_as_variable_with_api_key() {
    let (client, seen) = start("NRAK-test").await;
    let nrql = "SELECT count(*) FROM Transaction WHERE appName = 'Payment Service' AND name LIKE '%\"quoted\"%'";
    let body = client.nrql(nrql, None).await.unwrap();

    assert_eq!(body["data"]["actor"]["nrql"]["results"][0]["count"], 42);
    assert_eq!(seen.keys.lock().unwrap()[0], "NRAK-test");
    let sent = &seen.requests.lock().unwrap()[0];
    assert_eq!(sent["variables"]["nrql"], nrql);
    assert!(!sent["query"].as_str().unwrap().contains("Transaction"));
}

#[tokio::test]
async fn nrql_with_account_targets_account_scope() {
    let (client, seen) = start("NRAK-test").await;
    client.nrql("SELECT 1", Some("1234567")).await.unwrap();

    let sent = &seen.requests.lock().unwrap()[0];
    assert_eq!(sent["variables"]["accountId"], 1234567);
    assert!(sent["query"].as_str().unwrap().contains("account(id: $accountId)"));
}

#[tokio::test]
async fn http_failure_keeps_status_and_body() {
    let (client, _) = start("expired").await;
    match client.nrql("SELECT 1", None).await {
        Err(MetricsError::Api { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid key"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn entity_search_returns_entities() {
    let (client, seen) = start("NRAK-test").await;
    let entities = client
        .entity_search("domain = 'APM' AND type = 'APPLICATION'")
        .await
        .unwrap();

    assert_eq!(entities.len(), 2);
    assert_eq!(entities[1].application_id, Some(12));
    assert_eq!(
        seen.requests.lock().unwrap()[0]["variables"]["query"],
        "domain = 'APM' AND type = 'APPLICATION'"
    );
}

#[tokio::test]
async fn entity_search_graphql_errors_surface() {
    let (client, _) = start("NRAK-test").await;
    let err = client.entity_search("broken").await.unwrap_err();
    assert!(matches!(err, MetricsError::GraphQl(ref m) if m == "Invalid search query"));
}
