//! Services shared by every handler

use crate::error::ServerError;
use dbtassist_ai::{ChatGptClient, PatternGenerator, SqlGenerator};
use dbtassist_core::Config;
use dbtassist_dbt::ManifestReader;
use dbtassist_project::ModelFileManager;
use dbtassist_prompt::PromptProcessor;
use dbtassist_runner::DbtRunner;
use dbtassist_warehouse::DuckDbAdapter;
use std::sync::Arc;

/// Everything a request needs, built once at start-up
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manifest: Arc<ManifestReader>,
    pub pattern: Arc<PatternGenerator>,
    pub chatgpt: Option<Arc<ChatGptClient>>,
    pub runner: DbtRunner,
    pub files: Arc<ModelFileManager>,
}

impl AppState {
    /// Wire up the services described by `config`
    ///
    /// The manifest is read from disk, dbt is driven through the configured
    /// binary and previews come from the DuckDB file. ChatGPT is enabled only
    /// when the config carries an API key.
    pub fn from_config(config: Config) -> Result<Self, ServerError> {
        let processor = PromptProcessor::new()?;
        let chatgpt = ChatGptClient::from_config(&config.openai, processor.clone())?;
        match &chatgpt {
            Some(client) => tracing::info!(model = client.model(), "ChatGPT generation enabled"),
            None => tracing::info!("ChatGPT not configured, using pattern generation"),
        }

        let manifest = ManifestReader::load(config.manifest_path());
        let runner = DbtRunner::from_config(&config).with_preview(Arc::new(DuckDbAdapter::new(config.duckdb_path())));

        Ok(Self::new(config, manifest, PatternGenerator::new(processor), runner).with_chatgpt(chatgpt))
    }

    /// State from prebuilt parts, without ChatGPT
    pub fn new(config: Config, manifest: ManifestReader, pattern: PatternGenerator, runner: DbtRunner) -> Self {
        let files = ModelFileManager::new(config.models_dir());
        Self {
            config: Arc::new(config),
            manifest: Arc::new(manifest),
            pattern: Arc::new(pattern),
            chatgpt: None,
            runner,
            files: Arc::new(files),
        }
    }

    pub fn with_chatgpt(mut self, client: Option<ChatGptClient>) -> Self {
        self.chatgpt = client.map(Arc::new);
        self
    }

    /// ChatGPT when configured, the pattern generator otherwise
    pub fn preferred_generator(&self) -> &dyn SqlGenerator {
        match &self.chatgpt {
            Some(client) => client.as_ref(),
            None => self.pattern.as_ref(),
        }
    }
}
