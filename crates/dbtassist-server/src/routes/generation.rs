//! SQL generation, model files and validation

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use dbtassist_ai::{Engine, Generation, GenerationError, GenerationRequest, SqlGenerator};
use dbtassist_core::ValidationResult;
use dbtassist_project::validate_model_name;
use dbtassist_sql::{validate_sql, ValidationProfile};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A generated model, not yet written
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub success: bool,
    #[serde(flatten)]
    pub generation: Generation,
}

/// Outcome of generating and writing a model
#[derive(Debug, Serialize)]
pub struct ModelCreationResponse {
    pub success: bool,
    pub model_name: String,
    pub model_path: Option<String>,
    pub schema_path: Option<String>,
    pub message: String,
    pub sql_preview: String,
    pub conflicts: Vec<String>,
    pub warnings: Vec<String>,
    pub engine: Engine,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateParams {
    pub sql: Option<String>,
    pub model_name: Option<String>,

    /// Also compile the SQL with dbt
    #[serde(default)]
    pub compile: bool,
}

impl ValidateParams {
    /// Fields set in `self` win over `fallback`
    fn or(self, fallback: Self) -> Self {
        Self {
            sql: self.sql.or(fallback.sql),
            model_name: self.model_name.or(fallback.model_name),
            compile: self.compile || fallback.compile,
        }
    }
}

async fn run_generator(
    state: &AppState,
    generator: &dyn SqlGenerator,
    request: &GenerationRequest,
) -> Result<Generation, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt must not be empty".to_string()));
    }

    let snapshot = state.manifest.snapshot();
    generator
        .generate(request, snapshot.all_models())
        .await
        .map_err(ApiError::from)
}

/// ChatGPT when configured, patterns otherwise
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let generation = run_generator(&state, state.preferred_generator(), &request).await?;
    Ok(Json(GenerationResponse {
        success: true,
        generation,
    }))
}

pub async fn generate_chatgpt(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let client = state.chatgpt.clone().ok_or(GenerationError::Unavailable)?;
    let generation = run_generator(&state, client.as_ref(), &request).await?;
    Ok(Json(GenerationResponse {
        success: true,
        generation,
    }))
}

pub async fn generate_pattern(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let generation = run_generator(&state, state.pattern.as_ref(), &request).await?;
    Ok(Json(GenerationResponse {
        success: true,
        generation,
    }))
}

/// Generate a model and write it into the project
///
/// Conflicting files are reported, never overwritten.
pub async fn create_model(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<ModelCreationResponse>, ApiError> {
    let generation = run_generator(&state, state.preferred_generator(), &request).await?;
    let written = state.files.create_model(&generation.result)?;

    let Generation { result, engine, .. } = generation;
    Ok(Json(ModelCreationResponse {
        success: written.success,
        model_name: result.model_name,
        model_path: written.success.then(|| written.model_path.display().to_string()),
        schema_path: written.schema_path.map(|p| p.display().to_string()),
        message: written.message,
        sql_preview: result.sql,
        conflicts: written.conflicts,
        warnings: result.warnings,
        engine,
    }))
}

pub async fn delete_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.files.delete_model(&name)? {
        return Err(ApiError::NotFound(format!("Model '{}' not found", name)));
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Model '{}' deleted successfully", name),
    })))
}

pub async fn generated_models(State(state): State<AppState>) -> Json<Value> {
    let models = state.files.list_generated();
    Json(json!({
        "count": models.len(),
        "models": models,
    }))
}

/// Validate inline SQL or a model file in the project
///
/// Parameters come from the query string or a JSON body; the body wins.
/// With `compile`, dbt's verdict replaces the heuristic checks.
pub async fn validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateParams>,
    body: Option<Json<ValidateParams>>,
) -> Result<Json<ValidationResult>, ApiError> {
    let params = match body {
        Some(Json(body)) => body.or(query),
        None => query,
    };

    if let Some(sql) = params.sql.as_deref().filter(|s| !s.trim().is_empty()) {
        if params.compile {
            return Ok(Json(state.runner.validate_sql(sql).await));
        }
        return Ok(Json(validate_sql(sql, ValidationProfile::Generated)));
    }

    if let Some(name) = params.model_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        validate_model_name(name)?;
        let path = state
            .files
            .find_model_file(name)
            .ok_or_else(|| ApiError::NotFound(format!("Model '{}' not found", name)))?;
        if params.compile {
            return Ok(Json(state.runner.compile_model(name).await.into_validation()));
        }
        return Ok(Json(state.files.validate_model_file(&path)));
    }

    Err(ApiError::BadRequest(
        "Either 'sql' or 'model_name' must be provided".to_string(),
    ))
}
