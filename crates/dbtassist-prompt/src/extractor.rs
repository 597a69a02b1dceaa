//! Entity extraction from prompts

use dbtassist_core::{Materialization, ModelLookup};
use regex::Regex;
use std::collections::HashSet;

use crate::analysis::{JoinRequirement, JoinType, TableReference};
use crate::patterns::{
    captures, compile_all, compile_table, is_stopword, PatternSet, AGGREGATION_PATTERNS,
    FILTER_PATTERNS, JOIN_TYPE_PATTERNS, MATERIALIZATION_PATTERNS, OUTPUT_NAME_PATTERNS,
    TABLE_REFERENCE_PATTERNS, TRANSFORMATION_PATTERNS,
};

const PATTERN_MATCH_CONFIDENCE: f64 = 0.6;
const KNOWN_MODEL_CONFIDENCE: f64 = 0.8;
const MANIFEST_SCAN_CONFIDENCE: f64 = 0.9;
const JOIN_CONFIDENCE: f64 = 0.7;

/// Pulls tables, joins, names and clause fragments out of a prompt
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    table_patterns: Vec<Regex>,
    join_types: Vec<(JoinType, PatternSet)>,
    output_name_patterns: Vec<Regex>,
    materializations: Vec<(Materialization, PatternSet)>,
    filter_patterns: Vec<Regex>,
    aggregation_patterns: Vec<Regex>,
    transformation_patterns: Vec<Regex>,
}

impl EntityExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            table_patterns: compile_all(TABLE_REFERENCE_PATTERNS)?,
            join_types: compile_table(JOIN_TYPE_PATTERNS)?,
            output_name_patterns: compile_all(OUTPUT_NAME_PATTERNS)?,
            materializations: compile_table(MATERIALIZATION_PATTERNS)?,
            filter_patterns: compile_all(FILTER_PATTERNS)?,
            aggregation_patterns: compile_all(AGGREGATION_PATTERNS)?,
            transformation_patterns: compile_all(TRANSFORMATION_PATTERNS)?,
        })
    }

    /// Table references in first-seen order, deduplicated case-insensitively
    ///
    /// Pattern hits come first. Manifest models whose name appears anywhere
    /// in the prompt are appended after them, ordered by position.
    pub fn table_references<L>(&self, prompt: &str, lookup: &L) -> Vec<TableReference>
    where
        L: ModelLookup + ?Sized,
    {
        let mut seen = HashSet::new();
        let mut references = Vec::new();

        for re in &self.table_patterns {
            for caps in re.captures_iter(prompt) {
                let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                    continue;
                };
                if is_stopword(name) || !seen.insert(name.to_lowercase()) {
                    continue;
                }

                let is_model = lookup.is_model(name);
                references.push(TableReference {
                    name: name.to_string(),
                    alias: None,
                    is_model,
                    confidence: if is_model {
                        KNOWN_MODEL_CONFIDENCE
                    } else {
                        PATTERN_MATCH_CONFIDENCE
                    },
                });
            }
        }

        let lower = prompt.to_lowercase();
        let mut mentioned: Vec<(usize, &str)> = lookup
            .models()
            .iter()
            .map(|model| model.name.as_str())
            .filter(|name| !name.is_empty())
            .filter_map(|name| lower.find(&name.to_lowercase()).map(|at| (at, name)))
            .collect();
        mentioned.sort();

        for (_, name) in mentioned {
            if seen.insert(name.to_lowercase()) {
                references.push(TableReference {
                    name: name.to_string(),
                    alias: None,
                    is_model: true,
                    confidence: MANIFEST_SCAN_CONFIDENCE,
                });
            }
        }

        references
    }

    /// Highest-priority join type mentioned; inner when none is
    pub fn join_type(&self, prompt: &str) -> JoinType {
        self.join_types
            .iter()
            .find(|(_, set)| set.any_match(prompt))
            .map(|(join_type, _)| *join_type)
            .unwrap_or_default()
    }

    /// One join between the first two references, when there are two
    pub fn join_requirements(&self, prompt: &str, references: &[TableReference]) -> Vec<JoinRequirement> {
        match references {
            [left, right, ..] => vec![JoinRequirement {
                left_table: left.name.clone(),
                right_table: right.name.clone(),
                join_type: self.join_type(prompt),
                join_condition: None,
                confidence: JOIN_CONFIDENCE,
            }],
            _ => Vec::new(),
        }
    }

    /// First non-stopword capture of the first output-name pattern that has one
    pub fn output_name(&self, prompt: &str) -> Option<String> {
        self.output_name_patterns.iter().find_map(|re| {
            re.captures_iter(prompt)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .find(|name| !is_stopword(name))
                .map(str::to_string)
        })
    }

    /// First materialization mentioned; view when none is
    pub fn materialization(&self, prompt: &str) -> Materialization {
        self.materializations
            .iter()
            .find(|(_, set)| set.any_match(prompt))
            .map(|(materialization, _)| *materialization)
            .unwrap_or_default()
    }

    pub fn filters(&self, prompt: &str) -> Vec<String> {
        captures(&self.filter_patterns, prompt)
    }

    pub fn aggregations(&self, prompt: &str) -> Vec<String> {
        captures(&self.aggregation_patterns, prompt)
    }

    pub fn transformations(&self, prompt: &str) -> Vec<String> {
        captures(&self.transformation_patterns, prompt)
    }
}
