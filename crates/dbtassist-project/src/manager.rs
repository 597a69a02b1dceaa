//! Writing, finding and deleting model files under `models/`

use crate::schema::SchemaFile;
use crate::ProjectError;
use chrono::{DateTime, Utc};
use dbtassist_core::{Diagnostic, DiagnosticCode, Layer, Materialization, ValidationResult};
use dbtassist_sql::SqlGenerationResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Header line that marks a file as written by the assistant
pub const GENERATED_MARKER: &str = "-- Generated by dbtassist";

const SCHEMA_FILE: &str = "schema.yml";

/// Outcome of writing a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFileResult {
    pub success: bool,
    pub model_path: PathBuf,
    pub schema_path: Option<PathBuf>,
    pub message: String,
    pub conflicts: Vec<String>,
}

/// A model file carrying the generated-by marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModel {
    pub name: String,
    pub path: PathBuf,

    /// Name of the directory holding the file
    pub layer: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Model files of one dbt project
#[derive(Debug, Clone)]
pub struct ModelFileManager {
    models_dir: PathBuf,
}

impl ModelFileManager {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// `models/<layer>/<name>.sql`, the layer chosen by name prefix
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models_dir
            .join(Layer::for_new_model(model_name).as_str())
            .join(format!("{}.sql", model_name))
    }

    /// Existing files a new model would collide with
    pub fn conflicts(&self, model_path: &Path) -> Vec<String> {
        let mut conflicts = Vec::new();
        if model_path.exists() {
            conflicts.push(format!("Model file already exists: {}", model_path.display()));
        }

        let stem = file_stem(model_path).to_lowercase();
        let siblings = model_path
            .parent()
            .and_then(|dir| std::fs::read_dir(dir).ok())
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .map(|entry| entry.path());
        for sibling in siblings {
            let is_sql = sibling.extension().is_some_and(|ext| ext == "sql");
            if is_sql && sibling != model_path && file_stem(&sibling).to_lowercase() == stem {
                conflicts.push(format!("Similar model name exists: {}", sibling.display()));
            }
        }

        conflicts
    }

    /// Write the model file and merge its `schema.yml` entry
    ///
    /// Never overwrites: when the target or a case-insensitive sibling exists
    /// the result is unsuccessful and lists the conflicts.
    pub fn create_model(&self, generated: &SqlGenerationResult) -> Result<ModelFileResult, ProjectError> {
        validate_model_name(&generated.model_name)?;
        let model_path = self.model_path(&generated.model_name);

        let conflicts = self.conflicts(&model_path);
        if !conflicts.is_empty() {
            tracing::warn!(model = %generated.model_name, "refusing to overwrite existing model");
            return Ok(ModelFileResult {
                success: false,
                model_path,
                schema_path: None,
                message: format!("Model file conflicts detected: {}", conflicts.join(", ")),
                conflicts,
            });
        }

        if let Some(dir) = model_path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ProjectError::io(dir, e))?;
        }
        std::fs::write(&model_path, render_model_file(generated, Utc::now()))
            .map_err(|e| ProjectError::io(&model_path, e))?;
        tracing::info!(path = %model_path.display(), "created model file");

        let schema_path = if generated.description.is_some() || generated.materialization != Materialization::View {
            self.update_schema(&model_path, generated)
        } else {
            None
        };

        Ok(ModelFileResult {
            success: true,
            model_path,
            schema_path,
            message: format!("Successfully created model: {}", generated.model_name),
            conflicts: Vec::new(),
        })
    }

    /// Delete a model file and its `schema.yml` entry
    ///
    /// Returns `false` when no file exists. A `schema.yml` left without models
    /// is deleted too.
    pub fn delete_model(&self, model_name: &str) -> Result<bool, ProjectError> {
        validate_model_name(model_name)?;
        let Some(model_path) = self.find_model_file(model_name) else {
            tracing::warn!(model = model_name, "model file not found");
            return Ok(false);
        };

        std::fs::remove_file(&model_path).map_err(|e| ProjectError::io(&model_path, e))?;
        tracing::info!(path = %model_path.display(), "deleted model file");

        let Some(dir) = model_path.parent() else {
            return Ok(true);
        };
        let schema_path = dir.join(SCHEMA_FILE);
        if schema_path.exists() {
            let mut schema = SchemaFile::load_or_default(&schema_path)?;
            if schema.remove(model_name) {
                if schema.models.is_empty() {
                    std::fs::remove_file(&schema_path).map_err(|e| ProjectError::io(&schema_path, e))?;
                    tracing::info!(path = %schema_path.display(), "removed empty schema file");
                } else {
                    schema.save(&schema_path)?;
                }
            }
        }

        Ok(true)
    }

    /// Locate `<name>.sql`, trying the layer directories before the whole tree
    pub fn find_model_file(&self, model_name: &str) -> Option<PathBuf> {
        let file_name = format!("{}.sql", model_name);
        let direct = std::iter::once(self.models_dir.clone())
            .chain(
                [Layer::Staging, Layer::Intermediate, Layer::Marts]
                    .iter()
                    .map(|layer| self.models_dir.join(layer.as_str())),
            )
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file());

        direct.or_else(|| {
            WalkDir::new(&self.models_dir)
                .into_iter()
                .filter_map(Result::ok)
                .find(|entry| entry.file_type().is_file() && entry.file_name().to_string_lossy() == file_name)
                .map(|entry| entry.into_path())
        })
    }

    /// Every model file under `models/` that carries the generated marker
    pub fn list_generated(&self) -> Vec<GeneratedModel> {
        let mut generated: Vec<GeneratedModel> = WalkDir::new(&self.models_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "sql"))
            .filter_map(|entry| {
                let content = match std::fs::read_to_string(entry.path()) {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "failed to read model file");
                        return None;
                    }
                };
                if !content.contains(GENERATED_MARKER) {
                    return None;
                }

                let metadata = entry.metadata().ok();
                Some(GeneratedModel {
                    name: file_stem(entry.path()),
                    layer: entry
                        .path()
                        .parent()
                        .and_then(Path::file_name)
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    size: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
                    modified: metadata.and_then(|m| m.modified().ok()).map(DateTime::<Utc>::from),
                    path: entry.into_path(),
                })
            })
            .collect();

        generated.sort_by(|a, b| a.path.cmp(&b.path));
        generated
    }

    /// Read a model file and run the file-level checks on it
    pub fn validate_model_file(&self, path: &Path) -> ValidationResult {
        if !path.exists() {
            return ValidationResult::from_diagnostics(vec![Diagnostic::error(
                DiagnosticCode::FileError,
                format!("Model file does not exist: {}", path.display()),
            )]);
        }
        match std::fs::read_to_string(path) {
            Ok(content) => dbtassist_sql::validate_model_file(path, &content),
            Err(e) => ValidationResult::from_diagnostics(vec![Diagnostic::error(
                DiagnosticCode::FileError,
                format!("Failed to validate model: {}", e),
            )]),
        }
    }

    /// Merge the schema entry; failures are logged and leave the model file in place
    fn update_schema(&self, model_path: &Path, generated: &SqlGenerationResult) -> Option<PathBuf> {
        let schema_path = model_path.parent()?.join(SCHEMA_FILE);
        let result = SchemaFile::load_or_default(&schema_path).and_then(|mut schema| {
            schema.upsert(
                &generated.model_name,
                generated.description.as_deref(),
                generated.materialization,
            );
            schema.save(&schema_path)
        });

        match result {
            Ok(()) => {
                tracing::info!(path = %schema_path.display(), "updated schema file");
                Some(schema_path)
            }
            Err(e) => {
                tracing::error!(path = %schema_path.display(), error = %e, "failed to update schema file");
                None
            }
        }
    }
}

/// Header comments followed by the SQL
pub fn render_model_file(generated: &SqlGenerationResult, generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!("-- Model: {}", generated.model_name),
        GENERATED_MARKER.to_string(),
        format!("-- Generated at: {}", generated_at.to_rfc3339()),
    ];
    if let Some(description) = &generated.description {
        lines.push(format!("-- Description: {}", description));
    }
    if let Some(reasoning) = &generated.reasoning {
        lines.push(format!("-- Reasoning: {}", reasoning));
    }
    lines.push(String::new());
    lines.push(generated.sql.clone());

    lines.join("\n")
}

/// Model names become file names, so only identifier characters are allowed
pub fn validate_model_name(name: &str) -> Result<(), ProjectError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ProjectError::InvalidModelName(name.to_string()))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn generated(name: &str) -> SqlGenerationResult {
        SqlGenerationResult {
            sql: "select * from {{ ref('orders') }}".to_string(),
            model_name: name.to_string(),
            description: Some("Paid orders".to_string()),
            materialization: Materialization::Table,
            confidence: 0.8,
            reasoning: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn paths_follow_name_prefixes() {
        let manager = ModelFileManager::new("/p/models");
        assert_eq!(manager.model_path("stg_orders"), PathBuf::from("/p/models/staging/stg_orders.sql"));
        assert_eq!(manager.model_path("staging_x"), PathBuf::from("/p/models/staging/staging_x.sql"));
        assert_eq!(manager.model_path("int_orders"), PathBuf::from("/p/models/intermediate/int_orders.sql"));
        assert_eq!(manager.model_path("fct_orders"), PathBuf::from("/p/models/marts/fct_orders.sql"));
        assert_eq!(manager.model_path("dim_users"), PathBuf::from("/p/models/marts/dim_users.sql"));
        assert_eq!(manager.model_path("joined_orders"), PathBuf::from("/p/models/intermediate/joined_orders.sql"));
    }

    #[test]
    fn header_lines() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let content = render_model_file(&generated("paid_orders"), at);
        assert_eq!(
            content,
            "-- Model: paid_orders\n-- Generated by dbtassist\n-- Generated at: 2024-01-02T03:04:05+00:00\n-- Description: Paid orders\n\nselect * from {{ ref('orders') }}"
        );
    }

    #[test]
    fn names_with_path_characters_are_rejected() {
        let manager = ModelFileManager::new("/p/models");
        for name in ["../escape", "a/b", "", "x.sql"] {
            assert!(matches!(
                manager.create_model(&generated(name)),
                Err(ProjectError::InvalidModelName(_))
            ));
        }
    }

    #[test]
    fn missing_file_fails_validation() {
        let manager = ModelFileManager::new("/p/models");
        let result = manager.validate_model_file(Path::new("/p/models/ghost.sql"));
        assert!(!result.is_valid);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::FileError);
    }
}
