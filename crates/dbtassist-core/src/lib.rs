//! dbtassist core
//!
//! Shared domain types for the assistant: project configuration, dbt model
//! metadata and the diagnostics produced by SQL validation.

pub mod config;
pub mod diagnostic;
pub mod model;

pub use config::{Config, ConfigError, DbtConfig, OpenAiConfig, ProjectConfig, ServerConfig, WarehouseConfig};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, ValidationResult};
pub use model::{ColumnInfo, Layer, Materialization, ModelLookup, ManifestModel};
