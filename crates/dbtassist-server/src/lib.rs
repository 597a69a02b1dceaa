//! dbtassist HTTP API
//!
//! Exposes manifest browsing, SQL generation, model file management and dbt
//! execution over JSON. Errors come back as `{"detail": "..."}` with a
//! matching status code.
//!
//! ## Example
//!
//! ```rust,ignore
//! let state = AppState::from_config(Config::discover(None)?)?;
//! dbtassist_server::serve(state).await?;
//! ```

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ServerError};
pub use routes::router;
pub use state::AppState;

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(state: AppState) -> Result<(), ServerError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Bind(addr.clone(), e.to_string()))?;

    tracing::info!(
        addr = %addr,
        project = %state.config.project.path.display(),
        models = state.manifest.snapshot().all_models().len(),
        "dbtassist API listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
