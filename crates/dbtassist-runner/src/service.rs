//! Compile, run and validate flows over a [`DbtExecutor`]

use crate::command::{DbtCli, DbtExecutor, RunnerError};
use crate::output::{self, Phase};
use crate::results::{CompilationResult, CompileAndRunResult, ExecutionResult};
use dbtassist_core::{Config, Diagnostic, DiagnosticCode, ValidationResult};
use dbtassist_warehouse::{PreviewAdapter, PreviewError, PreviewRows, Relation};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

const COMPILE_EXCEPTION_SUGGESTION: &str = "Check that dbt is installed and the model exists";
const RUN_EXCEPTION_SUGGESTION: &str = "Check that dbt is installed and profiles.yml points at a reachable warehouse";
const VALIDATION_EXCEPTION_SUGGESTION: &str = "Check SQL syntax and dbt configuration";

/// Drives dbt for one project
#[derive(Clone)]
pub struct DbtRunner {
    executor: Arc<dyn DbtExecutor>,
    project_dir: PathBuf,
    preview: Option<Arc<dyn PreviewAdapter>>,
    preview_limit: usize,
}

impl DbtRunner {
    pub fn new(executor: Arc<dyn DbtExecutor>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            project_dir: project_dir.into(),
            preview: None,
            preview_limit: 100,
        }
    }

    /// Runner backed by the configured dbt binary
    pub fn from_config(config: &Config) -> Self {
        let cli = DbtCli::new(
            config.dbt.binary.clone(),
            config.project.path.clone(),
            Duration::from_secs(config.dbt.timeout_secs),
        );
        Self::new(Arc::new(cli), config.project.path.clone()).with_preview_limit(config.warehouse.preview_limit)
    }

    /// Preview built relations after successful runs
    pub fn with_preview(mut self, adapter: Arc<dyn PreviewAdapter>) -> Self {
        self.preview = Some(adapter);
        self
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn preview_adapter(&self) -> Option<&Arc<dyn PreviewAdapter>> {
        self.preview.as_ref()
    }

    /// `dbt compile --select <model>`
    pub async fn compile_model(&self, model_name: &str) -> CompilationResult {
        let started = Instant::now();
        let args = vec!["compile".to_string(), "--select".to_string(), model_name.to_string()];

        let out = match self.executor.invoke(&args).await {
            Ok(out) => out,
            Err(e) => {
                tracing::error!(model = model_name, error = %e, "dbt compile failed to run");
                return CompilationResult::failure(
                    model_name,
                    format!("Compilation failed: {}", e),
                    COMPILE_EXCEPTION_SUGGESTION,
                    started.elapsed().as_secs_f64(),
                );
            }
        };
        let elapsed = started.elapsed().as_secs_f64();

        if out.success {
            tracing::info!(model = model_name, seconds = elapsed, "compiled model");
            CompilationResult {
                success: true,
                model_name: model_name.to_string(),
                compiled_sql: self.compiled_sql(model_name),
                warnings: output::warnings(&out.stdout),
                compilation_time: Some(elapsed),
                ..CompilationResult::default()
            }
        } else {
            let (errors, suggestions) = output::parse_failure(&out.stdout, &out.stderr, Phase::Compile);
            tracing::warn!(model = model_name, errors = errors.len(), "model failed to compile");
            CompilationResult {
                success: false,
                model_name: model_name.to_string(),
                errors,
                suggestions,
                compilation_time: Some(elapsed),
                ..CompilationResult::default()
            }
        }
    }

    /// `dbt run --select <model>`, or `+<model>` to build upstream models first
    pub async fn run_model(&self, model_name: &str, with_dependencies: bool) -> ExecutionResult {
        let started = Instant::now();
        let selector = if with_dependencies {
            format!("+{}", model_name)
        } else {
            model_name.to_string()
        };
        let args = vec!["run".to_string(), "--select".to_string(), selector];

        let out = match self.executor.invoke(&args).await {
            Ok(out) => out,
            Err(e) => {
                tracing::error!(model = model_name, error = %e, "dbt run failed to start");
                return ExecutionResult::failure(
                    model_name,
                    format!("Execution failed: {}", e),
                    RUN_EXCEPTION_SUGGESTION,
                    started.elapsed().as_secs_f64(),
                );
            }
        };
        let elapsed = started.elapsed().as_secs_f64();

        if out.success {
            tracing::info!(model = model_name, seconds = elapsed, "ran model");
            ExecutionResult {
                success: true,
                model_name: model_name.to_string(),
                rows_affected: output::rows_affected(&out.stdout),
                execution_time: Some(elapsed),
                warnings: output::warnings(&out.stdout),
                preview_data: self.preview_after_run(model_name).await,
                ..ExecutionResult::default()
            }
        } else {
            let (errors, suggestions) = output::parse_failure(&out.stdout, &out.stderr, Phase::Run);
            tracing::warn!(model = model_name, errors = errors.len(), "model failed to run");
            ExecutionResult {
                success: false,
                model_name: model_name.to_string(),
                execution_time: Some(elapsed),
                errors,
                suggestions,
                ..ExecutionResult::default()
            }
        }
    }

    /// Compile, then run only if compilation succeeded
    pub async fn compile_and_run(&self, model_name: &str) -> CompileAndRunResult {
        let compilation = self.compile_model(model_name).await;
        let execution = if compilation.success {
            Some(self.run_model(model_name, false).await)
        } else {
            None
        };

        CompileAndRunResult { compilation, execution }
    }

    /// Check SQL by compiling it as a throwaway model
    ///
    /// The SQL is written to a temporary file in `models/` and compiled under
    /// the file's stem. The file is removed whatever the outcome.
    pub async fn validate_sql(&self, sql: &str) -> ValidationResult {
        let temp = match self.write_temp_model(sql) {
            Ok(temp) => temp,
            Err(e) => {
                let mut result = ValidationResult::from_diagnostics(vec![Diagnostic::error(
                    DiagnosticCode::CompileFailure,
                    format!("Validation failed: {}", e),
                )]);
                result.push(Diagnostic::info(DiagnosticCode::CompileFailure, VALIDATION_EXCEPTION_SUGGESTION));
                return result;
            }
        };

        let stem = temp
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let compilation = self.compile_model(&stem).await;
        drop(temp);

        compilation.into_validation()
    }

    /// `SELECT * FROM <model> LIMIT <limit>` through the preview adapter
    pub async fn results(&self, model_name: &str, limit: usize) -> Result<PreviewRows, PreviewError> {
        let adapter = self
            .preview
            .as_ref()
            .ok_or_else(|| PreviewError::ConfigError("No preview adapter configured".to_string()))?;
        let relation = Relation::parse(model_name)?;
        adapter.preview(&relation, limit).await
    }

    /// Compiled SQL for a model from `target/compiled/**/models/**/<model>.sql`
    pub fn compiled_sql(&self, model_name: &str) -> Option<String> {
        let compiled_dir = self.project_dir.join("target").join("compiled");
        let file_name = format!("{}.sql", model_name);

        WalkDir::new(&compiled_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && entry.file_name().to_string_lossy() == file_name)
            .find(|entry| entry.path().components().any(|c| c.as_os_str() == "models"))
            .and_then(|entry| match std::fs::read_to_string(entry.path()) {
                Ok(sql) => Some(sql),
                Err(e) => {
                    tracing::error!(path = %entry.path().display(), error = %e, "failed to read compiled SQL");
                    None
                }
            })
    }

    async fn preview_after_run(&self, model_name: &str) -> Option<Vec<serde_json::Map<String, serde_json::Value>>> {
        self.preview.as_ref()?;
        match self.results(model_name, self.preview_limit).await {
            Ok(rows) => Some(rows.rows),
            Err(e) => {
                tracing::error!(model = model_name, error = %e, "failed to preview model after run");
                None
            }
        }
    }

    fn write_temp_model(&self, sql: &str) -> Result<tempfile::NamedTempFile, RunnerError> {
        let models_dir = self.project_dir.join("models");
        let io_error = |e: std::io::Error| RunnerError::IoError(models_dir.display().to_string(), e.to_string());

        std::fs::create_dir_all(&models_dir).map_err(io_error)?;
        let mut temp = tempfile::Builder::new()
            .prefix("dbtassist_validate_")
            .suffix(".sql")
            .tempfile_in(&models_dir)
            .map_err(io_error)?;
        temp.write_all(sql.as_bytes()).map_err(io_error)?;
        temp.flush().map_err(io_error)?;
        Ok(temp)
    }
}
