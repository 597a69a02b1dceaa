//! dbt compile and run, plus warehouse previews

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use dbtassist_project::validate_model_name;
use dbtassist_runner::{CompilationResult, CompileAndRunResult, ExecutionResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Default, Deserialize)]
pub struct ModelParams {
    pub model_name: Option<String>,

    /// Select upstream models too (`+<model>`)
    #[serde(default)]
    pub with_dependencies: bool,
}

impl ModelParams {
    /// A plain model name; dbt selector syntax is refused
    fn model_name(&self) -> Result<&str, ApiError> {
        let name = self
            .model_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::missing_param("model_name"))?;
        validate_model_name(name)?;
        Ok(name)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultsParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ModelResults {
    pub model_name: String,
    pub data: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

pub async fn compile(
    State(state): State<AppState>,
    Query(params): Query<ModelParams>,
) -> Result<Json<CompilationResult>, ApiError> {
    let name = params.model_name()?;
    Ok(Json(state.runner.compile_model(name).await))
}

pub async fn run(
    State(state): State<AppState>,
    Query(params): Query<ModelParams>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let name = params.model_name()?;
    Ok(Json(state.runner.run_model(name, params.with_dependencies).await))
}

pub async fn compile_and_run(
    State(state): State<AppState>,
    Query(params): Query<ModelParams>,
) -> Result<Json<CompileAndRunResult>, ApiError> {
    let name = params.model_name()?;
    Ok(Json(state.runner.compile_and_run(name).await))
}

/// First rows of a built model
pub async fn results(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ResultsParams>,
) -> Result<Json<ModelResults>, ApiError> {
    let limit = params.limit.unwrap_or(state.config.warehouse.preview_limit);
    let rows = state.runner.results(&name, limit).await.map_err(|e| match ApiError::from(e) {
        ApiError::NotFound(_) => ApiError::NotFound(format!("No results found for model '{}'", name)),
        other => other,
    })?;

    Ok(Json(ModelResults {
        model_name: name,
        row_count: rows.len(),
        columns: rows.columns,
        data: rows.rows,
    }))
}
