//! Model search and filtering

use dbtassist_core::{Layer, ManifestModel, Materialization};
use serde::{Deserialize, Serialize};

/// Filters ANDed on top of the text query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Exact materialization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialization: Option<Materialization>,

    /// Layer name; known layers use their marker table, anything else is
    /// matched as a path substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,

    /// Model must carry at least one of these tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.materialization.is_none() && self.layer.is_none() && self.tags.is_empty()
    }

    /// Parse a comma-separated tag list, dropping blanks
    pub fn parse_tags(csv: &str) -> Vec<String> {
        csv.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether a model passes every filter
    pub fn accepts(&self, model: &ManifestModel) -> bool {
        if let Some(materialization) = self.materialization {
            if model.materialization != materialization {
                return false;
            }
        }

        if !self.tags.is_empty() && !self.tags.iter().any(|tag| model.tags.contains(tag)) {
            return false;
        }

        match self.layer.as_deref() {
            Some(layer) => matches_layer(model, layer),
            None => true,
        }
    }
}

fn matches_layer(model: &ManifestModel, layer: &str) -> bool {
    match Layer::parse(layer) {
        Some(known) => model.in_layer(known),
        None => {
            !model.path.is_empty() && model.path.to_lowercase().contains(&layer.to_lowercase())
        }
    }
}

/// Case-insensitive substring match on name, description or any tag
pub fn matches_query(model: &ManifestModel, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let query = query.to_lowercase();

    model.name.to_lowercase().contains(&query)
        || model
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&query))
        || model.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
}

/// Models matching the query and all filters, in input order
pub fn search<'a>(
    models: &'a [ManifestModel],
    query: &str,
    filters: &SearchFilters,
) -> Vec<&'a ManifestModel> {
    models
        .iter()
        .filter(|model| matches_query(model, query))
        .filter(|model| filters.accepts(model))
        .collect()
}
