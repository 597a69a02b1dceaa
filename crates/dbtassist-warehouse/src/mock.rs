//! Mock preview adapter for testing
//!
//! Serves predefined rows from memory. Used by the server and runner tests,
//! and by demos without a warehouse file.
//!
//! ```rust,ignore
//! let adapter = MockAdapter::new()
//!     .with_relation("orders", vec!["id"], vec![vec![json!(1)]])
//!     .with_latency(50);
//! let rows = adapter.preview(&Relation::parse("orders")?, 10).await?;
//! ```

use crate::adapter::{PreviewAdapter, PreviewError, PreviewRows, Relation};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory preview adapter
///
/// Clones share their relations, so a test can keep a handle and add data
/// after handing the adapter to the code under test.
#[derive(Clone)]
pub struct MockAdapter {
    /// Rows by relation name
    relations: Arc<RwLock<HashMap<String, PreviewRows>>>,

    /// Errors to return for specific relations
    errors: Arc<RwLock<HashMap<String, PreviewError>>>,

    fail_connection: bool,

    /// Simulated query latency (milliseconds)
    latency_ms: u64,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            relations: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            fail_connection: false,
            latency_ms: 0,
        }
    }

    /// Add rows for a relation, replacing any already there
    pub async fn add_relation(&self, name: impl Into<String>, rows: PreviewRows) {
        self.relations.write().await.insert(name.into(), rows);
    }

    /// Return `error` whenever `name` is previewed
    pub async fn add_error_for_relation(&self, name: impl Into<String>, error: PreviewError) {
        self.errors.write().await.insert(name.into(), error);
    }

    /// Builder form of [`MockAdapter::add_relation`] for use before sharing
    pub fn with_relation(self, name: &str, columns: Vec<&str>, values: Vec<Vec<Value>>) -> Self {
        let columns = columns.into_iter().map(str::to_string).collect();
        let rows = PreviewRows::from_values(columns, values);
        if let Ok(mut relations) = self.relations.try_write() {
            relations.insert(name.to_string(), rows);
        }
        self
    }

    /// Fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub async fn relation_count(&self) -> usize {
        self.relations.read().await.len()
    }

    pub async fn has_relation(&self, name: &str) -> bool {
        self.relations.read().await.contains_key(name)
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PreviewAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn preview(&self, relation: &Relation, limit: usize) -> Result<PreviewRows, PreviewError> {
        self.simulate_latency().await;

        let key = relation.to_string();
        if let Some(error) = self.errors.read().await.get(&key) {
            return Err(error.clone());
        }

        let relations = self.relations.read().await;
        relations
            .get(&key)
            .or_else(|| relations.get(relation.table()))
            .cloned()
            .map(|rows| rows.truncated(limit))
            .ok_or_else(|| PreviewError::RelationNotFound(relation.to_string()))
    }

    async fn test_connection(&self) -> Result<(), PreviewError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(PreviewError::ConnectionError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}
