//! New Relic NerdGraph client.
//!
//! Implements [`MetricsBackend`] over the GraphQL endpoint. User-supplied
//! NRQL and entity-search strings always travel as GraphQL variables.

use async_trait::async_trait;
use relicbot_core::error::MetricsError;
use relicbot_core::metrics::{Entity, MetricsBackend};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "https://api.newrelic.com/graphql";

const NRQL_QUERY: &str = "query($nrql: Nrql!) { actor { nrql(query: $nrql) { results } } }";

const ACCOUNT_NRQL_QUERY: &str = "query($accountId: Int!, $nrql: Nrql!) { \
     actor { account(id: $accountId) { nrql(query: $nrql) { results } } } }";

const ENTITY_SEARCH_QUERY: &str = "query($query: String!) { actor { entitySearch(query: $query) { \
     results { entities { name guid domain \
     ... on ApmApplicationEntityOutline { applicationId } } } } } }";

/// NerdGraph client authenticated with a user API key.
pub struct NerdGraphClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl NerdGraphClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the GraphQL endpoint (EU region, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Use a preconfigured HTTP client (shared timeout, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// POST one GraphQL document and return the raw response body.
    async fn post(&self, query: &str, variables: Value) -> Result<Value, MetricsError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("API-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| MetricsError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "NerdGraph returned error");
            return Err(MetricsError::Api { status, body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| MetricsError::Decode(e.to_string()))
    }
}

/// Concatenated `errors[].message` of a GraphQL response, if any.
fn graphql_errors(body: &Value) -> Option<String> {
    let errors = body.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[derive(Deserialize)]
struct EntitySearchData {
    data: Option<EntitySearchActor>,
}

#[derive(Deserialize)]
struct EntitySearchActor {
    actor: EntitySearchInner,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitySearchInner {
    entity_search: Option<EntitySearchResults>,
}

#[derive(Deserialize)]
struct EntitySearchResults {
    results: EntityList,
}

#[derive(Deserialize)]
struct EntityList {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[async_trait]
impl MetricsBackend for NerdGraphClient {
    async fn nrql(&self, query: &str, account_id: Option<&str>) -> Result<Value, MetricsError> {
        debug!(nrql = %query, account = ?account_id, "Running NRQL query");
        match account_id {
            Some(raw) => {
                let account: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| MetricsError::InvalidAccountId(raw.to_string()))?;
                self.post(ACCOUNT_NRQL_QUERY, json!({ "accountId": account, "nrql": query }))
                    .await
            }
            None => self.post(NRQL_QUERY, json!({ "nrql": query })).await,
        }
    }

    async fn entity_search(&self, query: &str) -> Result<Vec<Entity>, MetricsError> {
        debug!(query, "Searching entities");
        let body = self
            .post(ENTITY_SEARCH_QUERY, json!({ "query": query }))
            .await?;

        let parsed: EntitySearchData = serde_json::from_value(body.clone())
            .map_err(|e| MetricsError::Decode(e.to_string()))?;

        match parsed.data.and_then(|d| d.actor.entity_search) {
            Some(search) => Ok(search.results.entities),
            None => match graphql_errors(&body) {
                Some(message) => Err(MetricsError::GraphQl(message)),
                None => Ok(Vec::new()),
            },
        }
    }
}
