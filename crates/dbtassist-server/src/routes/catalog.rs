//! Manifest browsing: health, models, lineage, search, refresh

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use dbtassist_core::{ColumnInfo, ManifestModel, Materialization};
use dbtassist_dbt::{Lineage, ManifestInfo, SearchFilters};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Results per page for `/search/models` when no limit is given
const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub dbt_project_path: String,
    pub database_connected: bool,
    pub models_count: usize,
}

/// A model as listed by the API; the SQL body stays server-side
#[derive(Debug, Serialize)]
pub struct ModelView<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub description: Option<&'a str>,
    pub materialization: Materialization,
    pub tags: &'a [String],
    pub depends_on: &'a [String],
    pub referenced_by: &'a [String],
    pub columns: &'a [ColumnInfo],
}

impl<'a> From<&'a ManifestModel> for ModelView<'a> {
    fn from(model: &'a ManifestModel) -> Self {
        Self {
            name: &model.name,
            path: &model.path,
            description: model.description.as_deref(),
            materialization: model.materialization,
            tags: &model.tags,
            depends_on: &model.depends_on,
            referenced_by: &model.referenced_by,
            columns: &model.columns,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchHit<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub description: Option<&'a str>,
    pub materialization: Materialization,
    pub tags: &'a [String],
    pub column_count: usize,
    pub dependency_count: usize,
}

impl<'a> From<&'a ManifestModel> for SearchHit<'a> {
    fn from(model: &'a ManifestModel) -> Self {
        Self {
            name: &model.name,
            path: &model.path,
            description: model.description.as_deref(),
            materialization: model.materialization,
            tags: &model.tags,
            column_count: model.columns.len(),
            dependency_count: model.depends_on.len() + model.referenced_by.len(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub materialization: Option<String>,
    pub layer: Option<String>,
    pub tags: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub materialization: Option<String>,
    pub layer: Option<String>,
    pub tags: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Filters from query parameters; blank values are ignored
fn search_filters(
    materialization: Option<&str>,
    layer: Option<&str>,
    tags: Option<&str>,
) -> Result<SearchFilters, ApiError> {
    let materialization = non_blank(materialization)
        .map(|m| m.parse::<Materialization>().map_err(ApiError::BadRequest))
        .transpose()?;

    Ok(SearchFilters {
        materialization,
        layer: non_blank(layer).map(str::to_string),
        tags: tags.map(SearchFilters::parse_tags).unwrap_or_default(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `offset` then `limit`; a zero limit means no limit
fn page<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    let limit = limit.filter(|l| *l > 0).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_connected = match state.runner.preview_adapter() {
        Some(adapter) => adapter.test_connection().await.is_ok(),
        None => false,
    };

    Json(HealthResponse {
        status: "healthy",
        dbt_project_path: state.config.project.path.display().to_string(),
        database_connected,
        models_count: state.manifest.snapshot().all_models().len(),
    })
}

pub async fn ai_status(State(state): State<AppState>) -> Json<Value> {
    let chatgpt = state.chatgpt.as_deref();
    let (status, recommended) = match chatgpt {
        Some(_) => ("ready", "chatgpt"),
        None => ("not configured", "pattern_ai"),
    };

    Json(json!({
        "chatgpt": {
            "available": chatgpt.is_some(),
            "model": chatgpt.map(|client| client.model()),
            "status": status,
        },
        "pattern_ai": {
            "available": true,
            "status": "ready",
        },
        "recommended": recommended,
        "default_endpoint": "/generate",
    }))
}

pub async fn manifest_info(State(state): State<AppState>) -> Json<ManifestInfo> {
    Json(state.manifest.info())
}

pub async fn list_models(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let filters = search_filters(
        params.materialization.as_deref(),
        params.layer.as_deref(),
        params.tags.as_deref(),
    )?;
    let snapshot = state.manifest.snapshot();
    let matches = snapshot.search(params.search.as_deref().unwrap_or_default().trim(), &filters);

    let total_count = matches.len();
    let offset = params.offset.unwrap_or(0);
    let models: Vec<ModelView> = page(matches, offset, params.limit)
        .into_iter()
        .map(ModelView::from)
        .collect();

    Ok(Json(json!({
        "models": models,
        "total_count": total_count,
        "offset": offset,
        "limit": params.limit,
    })))
}

pub async fn model_details(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = state.manifest.snapshot();
    let model = snapshot
        .model_by_name(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Model '{}' not found", name)))?;

    Ok(Json(json!(ModelView::from(model))))
}

pub async fn lineage(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Lineage>, ApiError> {
    let snapshot = state.manifest.snapshot();
    if snapshot.model_by_name(&name).is_none() {
        return Err(ApiError::NotFound(format!("Model '{}' not found", name)));
    }
    Ok(Json(snapshot.dependencies(&name)))
}

pub async fn search_models(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.q.as_deref().map(str::trim).ok_or_else(|| ApiError::missing_param("q"))?;
    let filters = search_filters(
        params.materialization.as_deref(),
        params.layer.as_deref(),
        params.tags.as_deref(),
    )?;
    let snapshot = state.manifest.snapshot();
    let matches = snapshot.search(query, &filters);

    let total_count = matches.len();
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results: Vec<SearchHit> = page(matches, offset, Some(limit))
        .into_iter()
        .map(SearchHit::from)
        .collect();

    Ok(Json(json!({
        "results": results,
        "query": query,
        "total_count": total_count,
        "offset": offset,
        "limit": limit,
        "filters_applied": filters,
    })))
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let previous = state.manifest.snapshot().fingerprint().map(str::to_string);
    let snapshot = state
        .manifest
        .reload()
        .map_err(|e| ApiError::Internal(format!("Failed to reload manifest: {}", e)))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Manifest reloaded successfully",
        "models_count": snapshot.all_models().len(),
        "fingerprint": snapshot.fingerprint(),
        "changed": snapshot.fingerprint() != previous.as_deref(),
    })))
}
