//! dbt artifact access
//!
//! This crate handles:
//! - Parsing manifest.json (dbt-generated artifacts)
//! - Holding the current manifest as an immutable, swappable snapshot
//! - Upstream/downstream lookups and model search
//! - Column inference for models without documented columns

pub mod columns;
pub mod lineage;
pub mod manifest;
pub mod reader;
pub mod search;

pub use columns::infer_columns;
pub use lineage::Lineage;
pub use manifest::{ColumnDefinition, DependsOn, Manifest, ManifestError, ManifestMetadata, ManifestNode, NodeConfig};
pub use reader::{ManifestInfo, ManifestReader, ManifestSnapshot};
pub use search::{matches_query, search, SearchFilters};
