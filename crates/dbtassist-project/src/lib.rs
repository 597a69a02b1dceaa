//! dbtassist project files
//!
//! Writes generated models into the dbt project tree: the `.sql` file in the
//! layer directory its name implies, plus the matching `schema.yml` entry.

pub mod manager;
pub mod schema;

pub use manager::{
    render_model_file, validate_model_name, GeneratedModel, ModelFileManager, ModelFileResult, GENERATED_MARKER,
};
pub use schema::{SchemaFile, SchemaModel};

use std::path::Path;

/// Errors that can occur while touching model files
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Failed to access {0}: {1}")]
    IoError(String, String),

    #[error("Invalid schema file {0}: {1}")]
    SchemaError(String, String),

    #[error("Invalid model name '{0}': use letters, numbers and underscores")]
    InvalidModelName(String),
}

impl ProjectError {
    pub(crate) fn io(path: &Path, error: std::io::Error) -> Self {
        Self::IoError(path.display().to_string(), error.to_string())
    }
}
