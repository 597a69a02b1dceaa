//! dbt model metadata shared across crates

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How dbt builds a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    #[default]
    View,
    Table,
    Incremental,
    Ephemeral,
}

impl Materialization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Table => "table",
            Self::Incremental => "incremental",
            Self::Ephemeral => "ephemeral",
        }
    }
}

impl std::fmt::Display for Materialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Materialization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "table" => Ok(Self::Table),
            "incremental" => Ok(Self::Incremental),
            "ephemeral" => Ok(Self::Ephemeral),
            other => Err(format!("unknown materialization '{}'", other)),
        }
    }
}

/// Project layer, inferred from naming conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Staging,
    Intermediate,
    Marts,
    Raw,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Staging, Layer::Intermediate, Layer::Marts, Layer::Raw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Intermediate => "intermediate",
            Self::Marts => "marts",
            Self::Raw => "raw",
        }
    }

    /// Substrings that place a model path or name in this layer
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            Self::Staging => &["staging", "stg_"],
            Self::Intermediate => &["intermediate", "int_"],
            Self::Marts => &["marts", "mart_", "dim_", "fct_"],
            Self::Raw => &["raw", "source"],
        }
    }

    /// Parse a layer name; `None` for names outside the lookup table
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|layer| layer.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Directory under `models/` that a new model with this name belongs in
    pub fn for_new_model(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.starts_with("stg_") || name.starts_with("staging_") {
            Self::Staging
        } else if name.starts_with("dim_") || name.starts_with("fct_") || name.starts_with("mart_") {
            Self::Marts
        } else {
            Self::Intermediate
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column metadata, from the manifest or inferred from SQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,

    /// Declared type, or "unknown"
    pub data_type: String,

    pub description: Option<String>,

    /// Test names attached to the column
    #[serde(default)]
    pub tests: Vec<String>,
}

/// A dbt model as exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestModel {
    pub name: String,

    /// Original file path, e.g. `models/staging/stg_orders.sql`
    pub path: String,

    pub description: Option<String>,

    #[serde(default)]
    pub columns: Vec<ColumnInfo>,

    #[serde(default)]
    pub materialization: Materialization,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Upstream model names
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Downstream model names
    #[serde(default)]
    pub referenced_by: Vec<String>,

    /// Raw SQL body, when the manifest carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl ManifestModel {
    /// Minimal model, mostly useful for tests and fixtures
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            description: None,
            columns: Vec::new(),
            materialization: Materialization::default(),
            tags: Vec::new(),
            depends_on: Vec::new(),
            referenced_by: Vec::new(),
            sql: None,
        }
    }

    /// Whether the model's path carries one of the layer markers
    ///
    /// Models without a recorded path are matched on their name instead.
    pub fn in_layer(&self, layer: Layer) -> bool {
        let haystack = if self.path.is_empty() {
            self.name.to_lowercase()
        } else {
            self.path.to_lowercase()
        };
        layer.markers().iter().any(|marker| haystack.contains(marker))
    }

    /// First layer whose markers match, if any
    pub fn layer(&self) -> Option<Layer> {
        Layer::ALL.into_iter().find(|layer| self.in_layer(*layer))
    }
}

/// Read access to the set of known models
///
/// Implemented by manifest snapshots; prompt analysis and SQL generation only
/// need this view of the project.
pub trait ModelLookup {
    fn models(&self) -> &[ManifestModel];

    /// Exact-name lookup
    fn find_model(&self, name: &str) -> Option<&ManifestModel> {
        self.models().iter().find(|m| m.name == name)
    }

    fn is_model(&self, name: &str) -> bool {
        self.find_model(name).is_some()
    }
}

impl ModelLookup for [ManifestModel] {
    fn models(&self) -> &[ManifestModel] {
        self
    }
}

impl ModelLookup for Vec<ManifestModel> {
    fn models(&self) -> &[ManifestModel] {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materialization_parses_case_insensitively() {
        assert_eq!("TABLE".parse::<Materialization>().unwrap(), Materialization::Table);
        assert_eq!(" view ".parse::<Materialization>().unwrap(), Materialization::View);
        assert!("snapshot".parse::<Materialization>().is_err());
        assert_eq!(Materialization::default(), Materialization::View);
    }

    #[test]
    fn layer_membership_uses_path() {
        let stg = ManifestModel::new("stg_orders", "models/staging/stg_orders.sql");
        let dim = ManifestModel::new("dim_customers", "models/core/dim_customers.sql");
        let raw = ManifestModel::new("orders_snapshot", "models/source/orders_snapshot.sql");

        assert!(stg.in_layer(Layer::Staging));
        assert!(!stg.in_layer(Layer::Marts));
        assert!(dim.in_layer(Layer::Marts));
        assert_eq!(raw.layer(), Some(Layer::Raw));

        let unplaced = ManifestModel::new("stg_payments", "");
        assert!(unplaced.in_layer(Layer::Staging));
    }

    #[test]
    fn new_model_directory_by_prefix() {
        assert_eq!(Layer::for_new_model("stg_orders"), Layer::Staging);
        assert_eq!(Layer::for_new_model("staging_orders"), Layer::Staging);
        assert_eq!(Layer::for_new_model("int_orders_joined"), Layer::Intermediate);
        assert_eq!(Layer::for_new_model("fct_orders"), Layer::Marts);
        assert_eq!(Layer::for_new_model("Mart_revenue"), Layer::Marts);
        assert_eq!(Layer::for_new_model("joined_customers"), Layer::Intermediate);
    }

    #[test]
    fn layer_parse() {
        assert_eq!(Layer::parse("Staging"), Some(Layer::Staging));
        assert_eq!(Layer::parse("reporting"), None);
    }

    #[test]
    fn lookup_over_vec() {
        let models = vec![ManifestModel::new("customers", "models/customers.sql")];
        assert!(models.is_model("customers"));
        assert!(!models.is_model("Customers"));
        assert!(models.find_model("orders").is_none());
    }
}
