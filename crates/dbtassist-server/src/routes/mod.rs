//! Route table

pub mod catalog;
pub mod dbt;
pub mod generation;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Every endpoint, with CORS open to any origin and request tracing
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(catalog::health))
        .route("/ai-status", get(catalog::ai_status))
        .route("/manifest-info", get(catalog::manifest_info))
        .route("/models", get(catalog::list_models).post(generation::create_model))
        .route("/models/:name", get(catalog::model_details).delete(generation::delete_model))
        .route("/lineage/:name", get(catalog::lineage))
        .route("/search/models", get(catalog::search_models))
        .route("/refresh", post(catalog::refresh))
        .route("/generate", post(generation::generate))
        .route("/generate-chatgpt", post(generation::generate_chatgpt))
        .route("/generate-pattern", post(generation::generate_pattern))
        .route("/generated-models", get(generation::generated_models))
        .route("/validate", post(generation::validate))
        .route("/compile", post(dbt::compile))
        .route("/run", post(dbt::run))
        .route("/compile-and-run", post(dbt::compile_and_run))
        .route("/results/:name", get(dbt::results))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
