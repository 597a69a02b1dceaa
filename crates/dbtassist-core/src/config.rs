//! Configuration schema (dbtassist.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "dbtassist.toml";

/// dbt project location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// dbt project root (directory holding dbt_project.yml)
    pub path: PathBuf,

    /// Manifest path, relative to the project root unless absolute
    pub manifest_path: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            manifest_path: PathBuf::from("target/manifest.json"),
        }
    }
}

/// HTTP server binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
        }
    }
}

/// Warehouse used for result previews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// DuckDB database file, relative to the project root unless absolute
    pub duckdb_path: PathBuf,

    /// Default number of rows returned by previews
    pub preview_limit: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            duckdb_path: PathBuf::from("warehouse.duckdb"),
            preview_limit: 100,
        }
    }
}

/// dbt CLI invocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbtConfig {
    /// Executable name or path
    pub binary: String,

    /// Per-invocation timeout
    pub timeout_secs: u64,
}

impl Default for DbtConfig {
    fn default() -> Self {
        Self {
            binary: "dbt".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Chat completion settings
///
/// The API key is never read from or written to the config file; it comes
/// from `OPENAI_API_KEY` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
    pub timeout_secs: u64,

    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub warehouse: WarehouseConfig,

    #[serde(default)]
    pub dbt: DbtConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

impl Config {
    /// Load config from TOML file
    ///
    /// A relative `project.path` is resolved against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        if config.project.path.is_relative() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                config.project.path = parent.join(&config.project.path);
            }
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load `explicit` if given, else `./dbtassist.toml` when present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.exists() {
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        Ok(())
    }

    /// Apply `DBTASSIST_*` and `OPENAI_API_KEY` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("DBTASSIST_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("DBTASSIST_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DBTASSIST_PORT".to_string(), port))?;
        }
        if let Some(path) = var("DBTASSIST_PROJECT_PATH") {
            self.project.path = PathBuf::from(path);
        }
        if let Some(path) = var("DBTASSIST_DUCKDB_PATH") {
            self.warehouse.duckdb_path = PathBuf::from(path);
        }
        self.openai.api_key = var("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        Ok(())
    }

    /// Absolute-or-project-relative manifest location
    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.project.manifest_path)
    }

    /// Absolute-or-project-relative DuckDB location
    pub fn duckdb_path(&self) -> PathBuf {
        self.resolve(&self.warehouse.duckdb_path)
    }

    /// `models/` directory of the dbt project
    pub fn models_dir(&self) -> PathBuf {
        self.project.path.join("models")
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project.path.join(path)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {0}: {1}")]
    IoError(String, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
