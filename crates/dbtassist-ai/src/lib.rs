//! dbtassist SQL generators
//!
//! Two engines turn a natural-language request into a dbt model:
//!
//! - [`PatternGenerator`] runs the prompt analysis and the skeleton
//!   synthesizer. Always available, no network.
//! - [`ChatGptClient`] asks an OpenAI-compatible chat completions endpoint,
//!   with the manifest models as context. Available only when an API key is
//!   configured.
//!
//! Both implement [`SqlGenerator`], so callers pick one at run time.

pub mod chatgpt;
pub mod pattern;
pub mod response;
pub mod templates;

pub use chatgpt::{ChatGptClient, CHATGPT_CONFIDENCE, CHATGPT_REASONING};
pub use pattern::PatternGenerator;
pub use response::FALLBACK_CHATGPT_MODEL_NAME;
pub use templates::PromptTemplates;

use dbtassist_core::{ManifestModel, Materialization};
use dbtassist_prompt::PromptError;
use dbtassist_sql::SqlGenerationResult;
use serde::{Deserialize, Serialize};

/// A request to generate one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,

    /// Model names the caller wants the generator to focus on
    #[serde(default)]
    pub context: Vec<String>,

    #[serde(default)]
    pub output_name: Option<String>,

    /// Overrides the materialization found in the prompt when set
    #[serde(default)]
    pub materialization: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// The requested materialization, if any
    pub fn materialization(&self) -> Result<Option<Materialization>, GenerationError> {
        self.materialization
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(|m| m.parse::<Materialization>().map_err(GenerationError::InvalidRequest))
            .transpose()
    }
}

/// Which engine produced a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Pattern,
    Chatgpt,
}

/// A generated model plus the engine's advice about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    #[serde(flatten)]
    pub result: SqlGenerationResult,

    #[serde(default)]
    pub suggestions: Vec<String>,

    pub engine: Engine,
}

/// Errors that can occur while generating SQL
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("ChatGPT service not available. Please configure OPENAI_API_KEY.")]
    Unavailable,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("ChatGPT API error: {0}")]
    Api(String),

    #[error("ChatGPT request timed out after {0} seconds")]
    Timeout(u64),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Turns a request into a model
#[async_trait::async_trait]
pub trait SqlGenerator: Send + Sync {
    fn engine(&self) -> Engine;

    /// `models` is the current manifest, used for context and ref checks
    async fn generate(
        &self,
        request: &GenerationRequest,
        models: &[ManifestModel],
    ) -> Result<Generation, GenerationError>;
}
