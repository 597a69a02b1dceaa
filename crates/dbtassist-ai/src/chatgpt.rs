//! ChatGPT generation over the chat completions API

use crate::response::{extract_materialization, infer_model_name, review, strip_code_fences};
use crate::templates::PromptTemplates;
use crate::{Engine, Generation, GenerationError, GenerationRequest, SqlGenerator};
use dbtassist_core::{ManifestModel, OpenAiConfig};
use dbtassist_prompt::PromptProcessor;
use dbtassist_sql::SqlGenerationResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CHATGPT_CONFIDENCE: f64 = 0.95;
pub const CHATGPT_REASONING: &str = "Generated using ChatGPT with dbt context and best practices";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct ChatGptClient {
    http: reqwest::Client,
    api_key: String,
    config: OpenAiConfig,
    templates: PromptTemplates,
    processor: PromptProcessor,
}

impl std::fmt::Debug for ChatGptClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatGptClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl ChatGptClient {
    pub fn new(config: OpenAiConfig, api_key: impl Into<String>, processor: PromptProcessor) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Api(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            config,
            templates: PromptTemplates::new()?,
            processor,
        })
    }

    /// A client when the configuration carries an API key, `None` otherwise
    pub fn from_config(config: &OpenAiConfig, processor: PromptProcessor) -> Result<Option<Self>, GenerationError> {
        match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => Self::new(config.clone(), key, processor).map(Some),
            None => {
                tracing::warn!("OPENAI_API_KEY not set; ChatGPT generation disabled");
                Ok(None)
            }
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Models named in the request plus those the prompt mentions
    fn focus_models(&self, request: &GenerationRequest, models: &[ManifestModel]) -> Vec<String> {
        let context = self.processor.analyze(&request.prompt, models).generation_context();
        let mut focus: Vec<String> = Vec::new();
        for name in request
            .context
            .iter()
            .map(String::as_str)
            .chain(context.existing_models())
        {
            if !focus.iter().any(|f| f == name) {
                focus.push(name.to_string());
            }
        }
        focus
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!("{}: {}", status, detail.trim())));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| self.request_error(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Api("No content in response".to_string()))
    }

    fn request_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.config.timeout_secs)
        } else {
            GenerationError::Api(error.to_string())
        }
    }
}

#[async_trait::async_trait]
impl SqlGenerator for ChatGptClient {
    fn engine(&self) -> Engine {
        Engine::Chatgpt
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        models: &[ManifestModel],
    ) -> Result<Generation, GenerationError> {
        let requested = request.materialization()?;
        let materialization = requested.unwrap_or_default();
        let focus = self.focus_models(request, models);

        let system = self.templates.system_prompt(models)?;
        let user = self.templates.user_prompt(
            &request.prompt,
            materialization.as_str(),
            &focus,
            request.description.as_deref(),
        )?;

        let preview: String = request.prompt.chars().take(100).collect();
        tracing::info!(model = %self.config.model, prompt = %preview, "requesting SQL from ChatGPT");

        let content = self.complete(&system, &user).await?;
        let sql = strip_code_fences(&content);
        let (warnings, suggestions) = review(&sql, models);

        let model_name = request
            .output_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| infer_model_name(&request.prompt));
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Generated from: {}", request.prompt));
        tracing::info!(model = %model_name, warnings = warnings.len(), "generated SQL with ChatGPT");

        Ok(Generation {
            result: SqlGenerationResult {
                materialization: requested.unwrap_or_else(|| extract_materialization(&sql)),
                sql,
                model_name,
                description: Some(description),
                confidence: CHATGPT_CONFIDENCE,
                reasoning: Some(CHATGPT_REASONING.to_string()),
                warnings,
            },
            suggestions,
            engine: Engine::Chatgpt,
        })
    }
}
