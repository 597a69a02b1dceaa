//! Manifest reader with swappable snapshots
//!
//! A [`ManifestSnapshot`] is immutable once built. [`ManifestReader`] holds the
//! current one behind a lock and replaces it wholesale on reload, so a caller
//! that grabbed a snapshot keeps a consistent view for as long as it holds it.

use dbtassist_core::{ColumnInfo, ManifestModel, Materialization, ModelLookup};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::columns::infer_columns;
use crate::lineage::Lineage;
use crate::manifest::{Manifest, ManifestError, ManifestNode};
use crate::search::{self, SearchFilters};

/// Summary of the loaded manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub loaded: bool,
    pub total_models: usize,
    pub models_with_columns: usize,
    pub models_without_columns: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbt_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,

    /// SHA-256 of the manifest bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    pub message: String,
}

/// One immutable view of the project's models
#[derive(Debug, Clone, Default)]
pub struct ManifestSnapshot {
    manifest: Manifest,
    models: Vec<ManifestModel>,
    loaded: bool,
    fingerprint: Option<String>,
}

impl ManifestSnapshot {
    /// Snapshot with no models, used when no manifest could be read
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a manifest document and fingerprint its bytes
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest = Manifest::from_str(json)?;
        Ok(Self::from_manifest(manifest, Some(fingerprint(json.as_bytes()))))
    }

    pub fn from_manifest(manifest: Manifest, fingerprint: Option<String>) -> Self {
        let models = manifest
            .models()
            .map(|node| extract_model(&manifest, node))
            .collect();

        Self {
            manifest,
            models,
            loaded: true,
            fingerprint,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Every model, in unique_id order
    pub fn all_models(&self) -> &[ManifestModel] {
        &self.models
    }

    pub fn model_by_name(&self, name: &str) -> Option<&ManifestModel> {
        self.models.iter().find(|model| model.name == name)
    }

    /// Direct lineage, recomputed from the node graph
    pub fn dependencies(&self, name: &str) -> Lineage {
        Lineage::of(&self.manifest, name)
    }

    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<&ManifestModel> {
        search::search(&self.models, query, filters)
    }

    pub fn info(&self) -> ManifestInfo {
        if !self.loaded {
            return ManifestInfo {
                loaded: false,
                total_models: 0,
                models_with_columns: 0,
                models_without_columns: 0,
                dbt_version: None,
                generated_at: None,
                fingerprint: None,
                message: "No manifest loaded. Run 'dbt compile' to generate manifest.json".to_string(),
            };
        }

        let total = self.manifest.models().count();
        let with_columns = self
            .manifest
            .models()
            .filter(|node| !node.columns.is_empty())
            .count();

        ManifestInfo {
            loaded: true,
            total_models: total,
            models_with_columns: with_columns,
            models_without_columns: total - with_columns,
            dbt_version: self.manifest.metadata.dbt_version.clone(),
            generated_at: self.manifest.metadata.generated_at.clone(),
            fingerprint: self.fingerprint.clone(),
            message: format!(
                "Manifest loaded with {} models. {} have column definitions.",
                total, with_columns
            ),
        }
    }
}

impl ModelLookup for ManifestSnapshot {
    fn models(&self) -> &[ManifestModel] {
        &self.models
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn extract_model(manifest: &Manifest, node: &ManifestNode) -> ManifestModel {
    let columns: Vec<ColumnInfo> = if node.columns.is_empty() {
        let inferred = node.inference_sql().map(infer_columns).unwrap_or_default();
        if inferred.is_empty() {
            tracing::debug!(model = %node.name, "no column information available");
        }
        inferred
    } else {
        node.columns
            .iter()
            .map(|(name, column)| ColumnInfo {
                name: name.clone(),
                data_type: column
                    .data_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                description: Some(column.description.clone()).filter(|d| !d.is_empty()),
                tests: column.test_names(),
            })
            .collect()
    };

    let materialization = match node.config.materialized.as_deref() {
        None => Materialization::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::debug!(model = %node.name, materialized = raw, "unrecognised materialization, treating as view");
            Materialization::default()
        }),
    };

    let tags = if node.tags.is_empty() {
        node.config.tags.clone()
    } else {
        node.tags.clone()
    };

    ManifestModel {
        name: node.name.clone(),
        path: node.original_file_path.clone(),
        description: Some(node.description.clone()).filter(|d| !d.is_empty()),
        columns,
        materialization,
        tags,
        depends_on: manifest.upstream_models(node),
        referenced_by: manifest.downstream_models(node),
        sql: node.sql_body().map(str::to_string),
    }
}

/// Owns the manifest location and the current snapshot
#[derive(Debug)]
pub struct ManifestReader {
    path: PathBuf,
    current: RwLock<Arc<ManifestSnapshot>>,
}

impl ManifestReader {
    /// Read the manifest at `path`
    ///
    /// A missing or malformed file is logged and leaves the reader empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match read_snapshot(&path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "manifest unavailable, starting empty");
                ManifestSnapshot::empty()
            }
        };

        Self {
            path,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Reader over an in-memory snapshot; reloads still read `path`
    pub fn with_snapshot(path: impl Into<PathBuf>, snapshot: ManifestSnapshot) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<ManifestSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Re-read the manifest from disk and swap it in
    ///
    /// On failure the reader is left empty and the error returned.
    pub fn reload(&self) -> Result<Arc<ManifestSnapshot>, ManifestError> {
        let result = read_snapshot(&self.path);
        let (next, outcome) = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                tracing::info!(
                    path = %self.path.display(),
                    models = snapshot.all_models().len(),
                    "manifest reloaded"
                );
                (Arc::clone(&snapshot), Ok(snapshot))
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "manifest reload failed");
                (Arc::new(ManifestSnapshot::empty()), Err(err))
            }
        };

        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }

        outcome
    }

    pub fn get_all_models(&self) -> Vec<ManifestModel> {
        self.snapshot().all_models().to_vec()
    }

    pub fn get_model_by_name(&self, name: &str) -> Option<ManifestModel> {
        self.snapshot().model_by_name(name).cloned()
    }

    pub fn get_dependencies(&self, name: &str) -> Lineage {
        self.snapshot().dependencies(name)
    }

    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<ManifestModel> {
        self.snapshot()
            .search(query, filters)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn info(&self) -> ManifestInfo {
        self.snapshot().info()
    }
}

fn read_snapshot(path: &Path) -> Result<ManifestSnapshot, ManifestError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;
    let snapshot = ManifestSnapshot::from_json(&json)?;
    tracing::info!(
        path = %path.display(),
        models = snapshot.all_models().len(),
        "manifest loaded"
    );
    Ok(snapshot)
}
