//! Natural-language prompt analysis
//!
//! Turns a free-text request ("join customers with orders as a table") into a
//! [`PromptAnalysis`]: an intent with a confidence score plus the tables,
//! joins, clause fragments, output name and materialization it mentions.
//! Matching is driven entirely by the pattern tables in [`patterns`].

pub mod analysis;
pub mod extractor;
pub mod intent;
pub mod patterns;

pub use analysis::{GenerationContext, JoinRequirement, JoinType, ModelSchema, PromptAnalysis, TableReference};
pub use extractor::EntityExtractor;
pub use intent::{IntentClassifier, IntentType};

use dbtassist_core::ModelLookup;

/// Characters of the prompt quoted in generated descriptions
const DESCRIPTION_PROMPT_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Invalid prompt pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Classifier and extractor, compiled once and shared
#[derive(Debug, Clone)]
pub struct PromptProcessor {
    classifier: IntentClassifier,
    extractor: EntityExtractor,
}

impl PromptProcessor {
    pub fn new() -> Result<Self, PromptError> {
        Ok(Self {
            classifier: IntentClassifier::new()?,
            extractor: EntityExtractor::new()?,
        })
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    /// Analyse a prompt against the known models
    pub fn analyze<L>(&self, prompt: &str, models: &L) -> PromptAnalysis
    where
        L: ModelLookup + ?Sized,
    {
        let lower = prompt.to_lowercase();

        let (intent, confidence) = self.classifier.classify(prompt);
        let table_references = self.extractor.table_references(prompt, models);
        let join_requirements = self.extractor.join_requirements(&lower, &table_references);

        let context_models = table_references
            .iter()
            .filter(|reference| reference.is_model)
            .filter_map(|reference| models.find_model(&reference.name).cloned())
            .collect();

        let description = describe(prompt, intent, &table_references);

        let analysis = PromptAnalysis {
            intent,
            confidence,
            join_requirements,
            filters: self.extractor.filters(&lower),
            aggregations: self.extractor.aggregations(&lower),
            transformations: self.extractor.transformations(&lower),
            context_models,
            output_name: self.extractor.output_name(&lower),
            materialization: self.extractor.materialization(&lower),
            description,
            table_references,
        };

        tracing::debug!(
            intent = %analysis.intent,
            confidence = analysis.confidence,
            tables = analysis.table_references.len(),
            "prompt analysed"
        );

        analysis
    }
}

/// Description for create-model prompts; other intents get none
fn describe(prompt: &str, intent: IntentType, references: &[TableReference]) -> Option<String> {
    if intent != IntentType::CreateModel {
        return None;
    }

    let excerpt: String = prompt.chars().take(DESCRIPTION_PROMPT_CHARS).collect();
    let mut description = format!("Model generated from prompt: {}...", excerpt);
    if !references.is_empty() {
        let tables: Vec<&str> = references.iter().map(|r| r.name.as_str()).collect();
        description.push_str(&format!(" using tables: {}", tables.join(", ")));
    }
    Some(description)
}
