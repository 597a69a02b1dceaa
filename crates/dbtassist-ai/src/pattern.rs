//! Offline generation from prompt patterns

use crate::{Engine, Generation, GenerationError, GenerationRequest, SqlGenerator};
use dbtassist_core::ManifestModel;
use dbtassist_prompt::{PromptAnalysis, PromptProcessor};
use dbtassist_sql::synthesize;

/// Prompt analysis followed by skeleton synthesis
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    processor: PromptProcessor,
}

impl PatternGenerator {
    pub fn new(processor: PromptProcessor) -> Self {
        Self { processor }
    }

    /// Analyze the prompt and apply the request's overrides
    pub fn analyze(&self, request: &GenerationRequest, models: &[ManifestModel]) -> Result<PromptAnalysis, GenerationError> {
        let mut analysis = self.processor.analyze(&request.prompt, models);

        if let Some(name) = request.output_name.as_deref().filter(|n| !n.trim().is_empty()) {
            analysis.output_name = Some(name.trim().to_string());
        }
        if let Some(materialization) = request.materialization()? {
            analysis.materialization = materialization;
        }
        if let Some(description) = &request.description {
            analysis.description = Some(description.clone());
        }

        Ok(analysis)
    }
}

#[async_trait::async_trait]
impl SqlGenerator for PatternGenerator {
    fn engine(&self) -> Engine {
        Engine::Pattern
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        models: &[ManifestModel],
    ) -> Result<Generation, GenerationError> {
        let analysis = self.analyze(request, models)?;
        let result = synthesize(&analysis);
        tracing::info!(model = %result.model_name, intent = %analysis.intent.as_str(), "generated SQL from patterns");

        Ok(Generation {
            result,
            suggestions: Vec::new(),
            engine: Engine::Pattern,
        })
    }
}
