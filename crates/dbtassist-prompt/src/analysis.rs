//! Structured result of analysing a prompt

use dbtassist_core::{ColumnInfo, ManifestModel, Materialization};
use serde::{Deserialize, Serialize};

use crate::intent::IntentType;

/// A table or model named in the prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Whether the name matches a model in the manifest
    pub is_model: bool,

    pub confidence: f64,
}

/// SQL join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Full => "full",
        }
    }
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A join between two referenced tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequirement {
    pub left_table: String,
    pub right_table: String,
    pub join_type: JoinType,

    /// Never populated by the extractor today; SQL synthesis joins on `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_condition: Option<String>,

    pub confidence: f64,
}

/// Everything extracted from one prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptAnalysis {
    pub intent: IntentType,
    pub confidence: f64,
    pub table_references: Vec<TableReference>,
    pub join_requirements: Vec<JoinRequirement>,
    pub filters: Vec<String>,
    pub aggregations: Vec<String>,
    pub transformations: Vec<String>,

    /// Manifest entries for references that are models
    pub context_models: Vec<ManifestModel>,

    pub output_name: Option<String>,
    pub materialization: Materialization,
    pub description: Option<String>,
}

impl PromptAnalysis {
    /// Analysis of a prompt nothing could be extracted from
    pub fn empty() -> Self {
        Self {
            intent: IntentType::Unknown,
            confidence: 0.0,
            table_references: Vec::new(),
            join_requirements: Vec::new(),
            filters: Vec::new(),
            aggregations: Vec::new(),
            transformations: Vec::new(),
            context_models: Vec::new(),
            output_name: None,
            materialization: Materialization::default(),
            description: None,
        }
    }

    /// Compact view handed to LLM-backed generators
    pub fn generation_context(&self) -> GenerationContext {
        GenerationContext {
            intent: self.intent,
            tables: self.table_references.clone(),
            joins: self.join_requirements.clone(),
            schema_info: self
                .context_models
                .iter()
                .map(|model| ModelSchema {
                    name: model.name.clone(),
                    columns: model.columns.clone(),
                    materialization: model.materialization,
                    description: model.description.clone(),
                })
                .collect(),
        }
    }
}

/// Schema of one context model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub materialization: Materialization,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub intent: IntentType,
    pub tables: Vec<TableReference>,
    pub joins: Vec<JoinRequirement>,
    pub schema_info: Vec<ModelSchema>,
}

impl GenerationContext {
    /// Names of the known models the prompt is about
    pub fn existing_models(&self) -> Vec<&str> {
        self.schema_info.iter().map(|s| s.name.as_str()).collect()
    }
}
