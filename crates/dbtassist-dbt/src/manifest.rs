//! dbt manifest.json parsing
//!
//! Only the fields the assistant reads are modelled; everything else in the
//! artifact is ignored. Missing fields fall back to defaults so manifests from
//! different dbt versions parse.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// dbt manifest.json structure (subset of fields we care about)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// All nodes keyed by unique_id, in unique_id order
    #[serde(default)]
    pub nodes: BTreeMap<String, ManifestNode>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse manifest from JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        let mut manifest: Manifest =
            serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))?;

        // Keys are authoritative for ids
        for (id, node) in manifest.nodes.iter_mut() {
            if node.unique_id.is_empty() {
                node.unique_id = id.clone();
            }
        }

        Ok(manifest)
    }

    /// Model nodes only (filters out tests, seeds, snapshots, ...)
    pub fn models(&self) -> impl Iterator<Item = &ManifestNode> {
        self.nodes.values().filter(|node| node.is_model())
    }

    /// First model node with the given name
    pub fn model_by_name(&self, name: &str) -> Option<&ManifestNode> {
        self.models().find(|node| node.name == name)
    }

    /// Names of the models a node depends on directly, skipping sources,
    /// seeds and ids missing from the manifest
    pub fn upstream_models(&self, node: &ManifestNode) -> Vec<String> {
        node.depends_on
            .nodes
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|dep| dep.is_model())
            .map(|dep| dep.name.clone())
            .collect()
    }

    /// Names of the models that depend directly on `node`
    pub fn downstream_models(&self, node: &ManifestNode) -> Vec<String> {
        self.models()
            .filter(|other| other.unique_id != node.unique_id)
            .filter(|other| other.depends_on_id(&node.unique_id))
            .map(|other| other.name.clone())
            .collect()
    }

    /// Display name for a node id: the node's name when known, else the
    /// last dotted segment of the id
    pub fn name_of(&self, unique_id: &str) -> String {
        self.nodes
            .get(unique_id)
            .map(|node| node.name.clone())
            .unwrap_or_else(|| unique_id.rsplit('.').next().unwrap_or(unique_id).to_string())
    }
}

/// Manifest metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,

    #[serde(default)]
    pub dbt_version: Option<String>,

    #[serde(default)]
    pub generated_at: Option<String>,

    #[serde(default)]
    pub project_name: Option<String>,
}

/// A node in the manifest (model, test, seed, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.jaffle_shop.customers")
    #[serde(default)]
    pub unique_id: String,

    pub name: String,

    pub resource_type: String,

    #[serde(default)]
    pub package_name: String,

    /// Path relative to the models directory
    #[serde(default)]
    pub path: String,

    /// Path relative to the project root
    #[serde(default)]
    pub original_file_path: String,

    #[serde(default)]
    pub config: NodeConfig,

    #[serde(default)]
    pub description: String,

    /// Documented columns, in declaration order
    #[serde(default)]
    pub columns: IndexMap<String, ColumnDefinition>,

    #[serde(default)]
    pub depends_on: DependsOn,

    #[serde(default)]
    pub tags: Vec<String>,

    /// SQL before Jinja rendering (dbt >= 1.3)
    #[serde(default)]
    pub raw_code: Option<String>,

    /// SQL before Jinja rendering (dbt < 1.3)
    #[serde(default)]
    pub raw_sql: Option<String>,

    #[serde(default)]
    pub compiled_code: Option<String>,

    #[serde(default)]
    pub compiled_sql: Option<String>,
}

impl ManifestNode {
    pub fn is_model(&self) -> bool {
        self.resource_type == "model"
    }

    /// Best available SQL text, preferring raw over compiled
    pub fn sql_body(&self) -> Option<&str> {
        [&self.raw_code, &self.raw_sql, &self.compiled_code, &self.compiled_sql]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|sql| !sql.trim().is_empty())
    }

    /// SQL used for column inference, preferring compiled over raw
    pub fn inference_sql(&self) -> Option<&str> {
        [&self.compiled_code, &self.compiled_sql, &self.raw_code, &self.raw_sql]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|sql| !sql.trim().is_empty())
    }

    pub fn depends_on_id(&self, unique_id: &str) -> bool {
        self.depends_on.nodes.iter().any(|id| id == unique_id)
    }
}

/// Node configuration (from dbt_project.yml or model config)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub materialized: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            materialized: None,
            tags: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Column definition from manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub data_type: Option<String>,

    /// Either plain test names or `{test_metadata: {name}}` objects
    #[serde(default)]
    pub tests: Vec<serde_json::Value>,
}

impl ColumnDefinition {
    /// Test names, whichever shape the manifest used
    pub fn test_names(&self) -> Vec<String> {
        self.tests
            .iter()
            .filter_map(|test| match test {
                serde_json::Value::String(name) => Some(name.clone()),
                serde_json::Value::Object(map) => map
                    .get("test_metadata")
                    .and_then(|meta| meta.get("name"))
                    .and_then(|name| name.as_str())
                    .or_else(|| map.keys().next().map(String::as_str))
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Manifest parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "metadata": {"dbt_version": "1.7.4", "generated_at": "2024-01-01T00:00:00Z"},
        "nodes": {
            "model.shop.orders": {
                "unique_id": "model.shop.orders",
                "name": "orders",
                "resource_type": "model",
                "original_file_path": "models/marts/orders.sql",
                "config": {"materialized": "table"},
                "columns": {
                    "order_id": {"name": "order_id", "tests": ["unique", {"test_metadata": {"name": "not_null"}}]},
                    "amount": {"name": "amount", "data_type": "numeric"}
                },
                "depends_on": {"nodes": ["model.shop.stg_orders", "source.shop.raw.orders"]},
                "raw_code": "select * from {{ ref('stg_orders') }}"
            },
            "model.shop.stg_orders": {
                "name": "stg_orders",
                "resource_type": "model",
                "raw_sql": "select id from raw.orders"
            },
            "test.shop.unique_orders_order_id": {
                "name": "unique_orders_order_id",
                "resource_type": "test"
            }
        }
    }"#;

    #[test]
    fn parses_models_and_skips_other_nodes() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.metadata.dbt_version.as_deref(), Some("1.7.4"));

        let names: Vec<_> = manifest.models().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "stg_orders"]);
    }

    #[test]
    fn column_order_and_tests_are_preserved() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        let orders = manifest.model_by_name("orders").unwrap();

        let columns: Vec<_> = orders.columns.keys().cloned().collect();
        assert_eq!(columns, vec!["order_id", "amount"]);
        assert_eq!(orders.columns["order_id"].test_names(), vec!["unique", "not_null"]);
        assert_eq!(orders.columns["amount"].data_type.as_deref(), Some("numeric"));
    }

    #[test]
    fn dependencies_exclude_sources() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        let orders = manifest.model_by_name("orders").unwrap();
        let stg = manifest.model_by_name("stg_orders").unwrap();

        assert_eq!(manifest.upstream_models(orders), vec!["stg_orders"]);
        assert_eq!(manifest.downstream_models(stg), vec!["orders"]);
        assert!(manifest.downstream_models(orders).is_empty());
        assert_eq!(stg.unique_id, "model.shop.stg_orders");
        assert_eq!(manifest.name_of("model.shop.stg_orders"), "stg_orders");
        assert_eq!(manifest.name_of("model.other.unknown"), "unknown");
    }

    #[test]
    fn sql_body_falls_back_to_legacy_field() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        let stg = manifest.model_by_name("stg_orders").unwrap();
        assert_eq!(stg.sql_body(), Some("select id from raw.orders"));
        assert!(stg.config.enabled);
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = Manifest::from_str("{not json").unwrap_err();
        assert!(matches!(err, ManifestError::ParseError(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Manifest::from_file(Path::new("/nonexistent/manifest.json")).unwrap_err();
        assert!(matches!(err, ManifestError::IoError(_, _)));
    }
}
