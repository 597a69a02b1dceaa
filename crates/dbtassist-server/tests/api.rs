//! HTTP API driven through the router, without binding a socket
//!
//! Each test gets a throwaway dbt project: a manifest under `target/`, an
//! empty `models/` tree, a scripted dbt and an in-memory warehouse.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use dbtassist_ai::PatternGenerator;
use dbtassist_core::Config;
use dbtassist_dbt::ManifestReader;
use dbtassist_prompt::PromptProcessor;
use dbtassist_runner::{CommandOutput, DbtExecutor, DbtRunner, RunnerError};
use dbtassist_server::{router, AppState};
use dbtassist_sql::{MISSING_SELECT_MESSAGE, RAW_REFERENCE_MESSAGE};
use dbtassist_warehouse::MockAdapter;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const MANIFEST: &str = r#"{
    "metadata": {"dbt_version": "1.7.4", "generated_at": "2024-05-01T12:00:00Z"},
    "nodes": {
        "model.shop.customers": {
            "name": "customers", "resource_type": "model",
            "original_file_path": "models/marts/customers.sql",
            "description": "One row per customer",
            "config": {"materialized": "table"},
            "tags": ["core"],
            "columns": {
                "customer_id": {"name": "customer_id", "description": "Primary key", "tests": ["unique", "not_null"]},
                "name": {"name": "name"}
            },
            "depends_on": {"nodes": ["model.shop.stg_customers"]}
        },
        "model.shop.orders": {
            "name": "orders", "resource_type": "model",
            "original_file_path": "models/marts/orders.sql",
            "description": "One row per order",
            "config": {"materialized": "table"},
            "tags": ["core", "finance"],
            "columns": {"order_id": {"name": "order_id"}},
            "depends_on": {"nodes": ["model.shop.stg_orders"]}
        },
        "model.shop.stg_customers": {
            "name": "stg_customers", "resource_type": "model",
            "original_file_path": "models/staging/stg_customers.sql",
            "raw_code": "select id as customer_id, first_name as name from {{ source('raw', 'customers') }}"
        },
        "model.shop.stg_orders": {
            "name": "stg_orders", "resource_type": "model",
            "original_file_path": "models/staging/stg_orders.sql",
            "raw_code": "select id as order_id, user_id, amount from {{ source('raw', 'orders') }}"
        }
    }
}"#;

/// Succeeds at everything; runs report three rows
struct FakeDbt;

#[async_trait::async_trait]
impl DbtExecutor for FakeDbt {
    async fn invoke(&self, args: &[String]) -> Result<CommandOutput, RunnerError> {
        match args.first().map(String::as_str) {
            Some("run") => Ok(CommandOutput::succeeded(format!(
                "1 of 1 OK created sql table model main.{} ... [SELECT 3 rows in 0.10s]",
                args[2]
            ))),
            _ => Ok(CommandOutput::succeeded("12:00:00  Found 4 models")),
        }
    }
}

fn project() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("target")).unwrap();
    std::fs::create_dir_all(dir.path().join("models")).unwrap();
    std::fs::write(dir.path().join("target/manifest.json"), MANIFEST).unwrap();

    let mut config = Config::default();
    config.project.path = dir.path().to_path_buf();

    let warehouse = MockAdapter::new().with_relation(
        "customers",
        vec!["customer_id", "name"],
        vec![vec![json!(1), json!("Ada")], vec![json!(2), json!("Grace")]],
    );
    let runner = DbtRunner::new(Arc::new(FakeDbt), dir.path()).with_preview(Arc::new(warehouse));
    let manifest = ManifestReader::load(config.manifest_path());
    let pattern = PatternGenerator::new(PromptProcessor::new().unwrap());

    (dir, AppState::new(config, manifest, pattern, runner))
}

async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
    send(state, "GET", uri, None).await
}

async fn post(state: &AppState, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(state, "POST", uri, body).await
}

fn names(values: &Value) -> Vec<String> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_and_status() {
    let (_dir, state) = project();

    let (status, health) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["models_count"], 4);
    assert_eq!(health["database_connected"], true);

    let (_, ai) = get(&state, "/ai-status").await;
    assert_eq!(ai["chatgpt"]["available"], false);
    assert_eq!(ai["chatgpt"]["model"], Value::Null);
    assert_eq!(ai["recommended"], "pattern_ai");

    let (_, info) = get(&state, "/manifest-info").await;
    assert_eq!(info["loaded"], true);
    assert_eq!(info["total_models"], 4);
    assert_eq!(info["models_with_columns"], 2);
    assert_eq!(info["dbt_version"], "1.7.4");
}

#[tokio::test]
async fn models_are_filtered_and_paged() {
    let (_dir, state) = project();

    let (status, body) = get(&state, "/models?layer=staging").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["models"]), vec!["stg_customers", "stg_orders"]);
    assert_eq!(body["total_count"], 2);

    let (_, body) = get(&state, "/models?tags=finance").await;
    assert_eq!(names(&body["models"]), vec!["orders"]);

    let (_, body) = get(&state, "/models?limit=1&offset=1").await;
    assert_eq!(names(&body["models"]), vec!["orders"]);
    assert_eq!(body["total_count"], 4);
    assert_eq!(body["limit"], 1);

    let (status, body) = get(&state, "/models?materialization=snapshot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("snapshot"));
}

#[tokio::test]
async fn model_details_and_lineage() {
    let (_dir, state) = project();

    let (status, model) = get(&state, "/models/customers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(model["materialization"], "table");
    assert_eq!(model["columns"][0]["tests"], json!(["unique", "not_null"]));
    assert_eq!(model["depends_on"], json!(["stg_customers"]));
    assert!(model.get("sql").is_none());

    let (status, lineage) = get(&state, "/lineage/stg_orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lineage["upstream"], json!([]));
    assert_eq!(lineage["downstream"], json!(["orders"]));

    let (status, body) = get(&state, "/models/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Model 'ghost' not found");

    let (status, _) = get(&state, "/lineage/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_needs_a_query() {
    let (_dir, state) = project();

    let (status, body) = get(&state, "/search/models").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Missing query parameter 'q'");

    let (status, body) = get(&state, "/search/models?q=customer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["results"]), vec!["customers", "stg_customers"]);
    assert_eq!(body["results"][0]["column_count"], 2);
    assert_eq!(body["results"][0]["dependency_count"], 1);
    assert_eq!(body["limit"], 50);
    assert_eq!(body["filters_applied"], json!({}));

    let (_, body) = get(&state, "/search/models?q=customer&layer=marts").await;
    assert_eq!(names(&body["results"]), vec!["customers"]);
    assert_eq!(body["filters_applied"], json!({"layer": "marts"}));
}

#[tokio::test]
async fn refresh_reports_changes() {
    let (dir, state) = project();

    let (status, body) = post(&state, "/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], false);
    assert_eq!(body["models_count"], 4);

    let trimmed: Value = {
        let mut manifest: Value = serde_json::from_str(MANIFEST).unwrap();
        manifest["nodes"].as_object_mut().unwrap().remove("model.shop.stg_orders");
        manifest
    };
    std::fs::write(dir.path().join("target/manifest.json"), trimmed.to_string()).unwrap();

    let (_, body) = post(&state, "/refresh", None).await;
    assert_eq!(body["changed"], true);
    assert_eq!(body["models_count"], 3);

    std::fs::write(dir.path().join("target/manifest.json"), "{ not json").unwrap();
    let (status, body) = post(&state, "/refresh", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().starts_with("Failed to reload manifest"));
}

#[tokio::test]
async fn generation_falls_back_to_patterns() {
    let (_dir, state) = project();
    let request = json!({"prompt": "create a model that joins customers with orders"});

    let (status, body) = post(&state, "/generate", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["engine"], "pattern");
    assert_eq!(body["confidence"], 0.8);
    let sql = body["sql"].as_str().unwrap();
    assert!(sql.contains("left_table as ("));
    assert!(sql.contains("inner join"));

    let (status, pattern) = post(&state, "/generate-pattern", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pattern["sql"], body["sql"]);

    let (status, body) = post(&state, "/generate-chatgpt", Some(request)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["detail"],
        "ChatGPT service not available. Please configure OPENAI_API_KEY."
    );

    let (status, _) = post(&state, "/generate", Some(json!({"prompt": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &state,
        "/generate",
        Some(json!({"prompt": "orders by day", "materialization": "snapshot"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn model_files_lifecycle() {
    let (dir, state) = project();
    let request = json!({
        "prompt": "create a model that joins customers with orders",
        "output_name": "customer_orders",
        "materialization": "table",
    });

    let (status, created) = post(&state, "/models", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["success"], true);
    assert_eq!(created["model_name"], "customer_orders");
    let model_path = dir.path().join("models/intermediate/customer_orders.sql");
    assert_eq!(created["model_path"], model_path.display().to_string());
    assert!(model_path.is_file());
    assert!(created["schema_path"].as_str().unwrap().ends_with("schema.yml"));

    let (_, again) = post(&state, "/models", Some(request)).await;
    assert_eq!(again["success"], false);
    assert_eq!(again["model_path"], Value::Null);
    assert_eq!(again["conflicts"].as_array().unwrap().len(), 1);

    let (_, listed) = get(&state, "/generated-models").await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["models"][0]["name"], "customer_orders");

    let (status, validation) = post(&state, "/validate?model_name=customer_orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(validation["is_valid"].is_boolean());

    let (status, _) = send(&state, "DELETE", "/models/customer_orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!model_path.exists());

    let (status, body) = send(&state, "DELETE", "/models/customer_orders", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Model 'customer_orders' not found");
}

#[tokio::test]
async fn validate_inline_sql() {
    let (dir, state) = project();

    let (status, body) = post(&state, "/validate?sql=select%20*%20from%20orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["warnings"], json!([RAW_REFERENCE_MESSAGE]));

    let (_, body) = post(&state, "/validate?sql=insert%20into%20x%20values%20(1)", None).await;
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["errors"][0], MISSING_SELECT_MESSAGE);

    let (status, body) = post(&state, "/validate", Some(json!({"sql": "select id from {{ ref('orders') }}"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["warnings"], json!([]));

    let (status, body) = post(&state, "/validate", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Either 'sql' or 'model_name' must be provided");

    let (status, _) = post(&state, "/validate?model_name=ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&state, "/validate?model_name=..%2Fsecrets", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // dbt compiles it, so dbt's verdict stands over the heuristics
    let (_, body) = post(&state, "/validate?sql=insert%20into%20x%20values%20(1)&compile=true", None).await;
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["errors"], json!([]));

    std::fs::write(dir.path().join("models/legacy.sql"), "insert into x values (1)").unwrap();
    let (status, body) = post(&state, "/validate?model_name=legacy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);
    let (_, body) = post(&state, "/validate", Some(json!({"model_name": "legacy", "compile": true}))).await;
    assert_eq!(body["is_valid"], true);
}

#[tokio::test]
async fn compile_run_and_preview() {
    let (_dir, state) = project();

    let (status, compiled) = post(&state, "/compile?model_name=customers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(compiled["success"], true);
    assert_eq!(compiled["compiled_sql"], Value::Null);

    let (_, ran) = post(&state, "/run?model_name=customers&with_dependencies=true", None).await;
    assert_eq!(ran["success"], true);
    assert_eq!(ran["rows_affected"], 3);
    assert_eq!(ran["preview_data"][1]["name"], "Grace");

    let (_, both) = post(&state, "/compile-and-run?model_name=customers", None).await;
    assert_eq!(both["compilation"]["success"], true);
    assert_eq!(both["execution"]["rows_affected"], 3);

    let (status, results) = get(&state, "/results/customers?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["row_count"], 1);
    assert_eq!(results["columns"], json!(["customer_id", "name"]));
    assert_eq!(results["data"], json!([{"customer_id": 1, "name": "Ada"}]));

    let (status, body) = get(&state, "/results/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "No results found for model 'ghost'");

    let (status, body) = post(&state, "/compile", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Missing query parameter 'model_name'");

    for uri in ["/compile?model_name=*", "/run?model_name=tag%3Afinance", "/compile-and-run?model_name=%2Bcustomers"] {
        let (status, _) = post(&state, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn missing_manifest_still_serves() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.project.path = dir.path().to_path_buf();

    let runner = DbtRunner::new(Arc::new(FakeDbt), dir.path());
    let manifest = ManifestReader::load(config.manifest_path());
    let state = AppState::new(config, manifest, PatternGenerator::new(PromptProcessor::new().unwrap()), runner);

    let (status, health) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["models_count"], 0);
    assert_eq!(health["database_connected"], false);

    let (_, info) = get(&state, "/manifest-info").await;
    assert_eq!(info["loaded"], false);

    let (status, body) = post(&state, "/generate", Some(json!({"prompt": "something vague"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_name"], "generated_model");

    let (status, _) = get(&state, "/results/customers").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
