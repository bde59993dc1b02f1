//! Metrics-backend collaborator: the telemetry store queried for existing
//! monitoring (New Relic NerdGraph).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// An entity returned by an entity search (APM application, dashboard, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, rename = "applicationId", skip_serializing_if = "Option::is_none")]
    pub application_id: Option<u64>,
}

#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Run an NRQL query, optionally against a specific account, and return
    /// the raw response document.
    async fn nrql(
        &self,
        query: &str,
        account_id: Option<&str>,
    ) -> Result<serde_json::Value, MetricsError>;

    /// Search entities with an entity-search query such as
    /// `domain = 'APM' AND type = 'APPLICATION'`.
    async fn entity_search(&self, query: &str) -> Result<Vec<Entity>, MetricsError>;
}
