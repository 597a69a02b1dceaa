//! `schema.yml` property files
//!
//! Only the keys the assistant manages are typed. Everything else in an
//! existing file (tests, columns, meta, sources) is carried through untouched.

use crate::ProjectError;
use dbtassist_core::Materialization;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;

fn default_version() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub models: Vec<SchemaModel>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Mapping>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Default for SchemaFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            models: Vec::new(),
            extra: IndexMap::new(),
        }
    }
}

impl SchemaFile {
    /// Read a property file, or start a new one when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ProjectError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ProjectError::SchemaError(path.display().to_string(), e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ProjectError::SchemaError(path.display().to_string(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ProjectError::io(path, e))
    }

    pub fn model(&self, name: &str) -> Option<&SchemaModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Add or update the entry for a model
    ///
    /// An existing entry keeps its other keys; the description is replaced
    /// when one is given and a non-view materialization is written into its
    /// `config`.
    pub fn upsert(&mut self, name: &str, description: Option<&str>, materialization: Materialization) {
        let index = match self.models.iter().position(|m| m.name == name) {
            Some(index) => index,
            None => {
                self.models.push(SchemaModel {
                    name: name.to_string(),
                    description: None,
                    config: None,
                    extra: IndexMap::new(),
                });
                self.models.len() - 1
            }
        };
        let entry = &mut self.models[index];

        if let Some(description) = description {
            entry.description = Some(description.to_string());
        }
        if materialization != Materialization::View {
            entry
                .config
                .get_or_insert_with(Mapping::new)
                .insert(Value::from("materialized"), Value::from(materialization.as_str()));
        }
    }

    /// Drop the entry for a model; returns whether one was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.models.len();
        self.models.retain(|m| m.name != name);
        self.models.len() != before
    }
}
