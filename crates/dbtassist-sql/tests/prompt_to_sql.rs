//! Prompt analysis through synthesis and validation

use dbtassist_core::{ManifestModel, Materialization};
use dbtassist_prompt::{IntentType, PromptProcessor};
use dbtassist_sql::{synthesize, validate_sql, ValidationProfile, FALLBACK_MODEL_NAME, MISSING_SELECT_MESSAGE};

fn jaffle_models() -> Vec<ManifestModel> {
    vec![
        ManifestModel::new("stg_customers", "models/staging/stg_customers.sql"),
        ManifestModel::new("stg_orders", "models/staging/stg_orders.sql"),
        ManifestModel::new("customers", "models/marts/customers.sql"),
        ManifestModel::new("orders", "models/marts/orders.sql"),
    ]
}

#[test]
fn join_prompt_produces_join_skeleton() {
    let processor = PromptProcessor::new().unwrap();
    let analysis = processor.analyze("create a model that joins customers with orders", &jaffle_models());
    assert_eq!(analysis.intent, IntentType::JoinTables);

    let result = synthesize(&analysis);
    assert!(result.sql.contains("left_table as ("));
    assert!(result.sql.contains("right_table as ("));
    assert!(result.sql.contains("inner join"));
    assert!(result.sql.ends_with("select * from final"));
    assert_eq!(result.sql.matches("final as (").count(), 1);
    assert_eq!(result.sql.matches("join right_table").count(), 1);
    assert!(result.sql.contains("{{ ref('customers') }}"));
    assert!(result.sql.contains("{{ ref('orders') }}"));

    let validation = validate_sql(&result.sql, ValidationProfile::Generated);
    assert!(validation.is_valid);
    assert!(validation.warnings.is_empty(), "{:?}", validation.warnings);
}

#[test]
fn left_join_table_prompt() {
    let processor = PromptProcessor::new().unwrap();
    let analysis = processor.analyze(
        "left join stg_customers with stg_orders and save it as a table",
        &jaffle_models(),
    );

    let result = synthesize(&analysis);
    assert_eq!(result.materialization, Materialization::Table);
    assert!(result.sql.starts_with("{{\n  config("));
    assert!(result.sql.contains("  left join right_table"));
    assert_eq!(result.model_name, "joined_stg_customers");
}

#[test]
fn prompt_without_tables_gets_placeholder() {
    let processor = PromptProcessor::new().unwrap();
    let analysis = processor.analyze("hello there", &jaffle_models());
    assert_eq!(analysis.intent, IntentType::Unknown);

    let result = synthesize(&analysis);
    assert_eq!(
        result.sql.lines().collect::<Vec<_>>(),
        vec![
            "-- No table references found in prompt",
            "-- Please specify which tables or models to use",
            "select 1 as placeholder",
        ]
    );
    assert_eq!(result.model_name, FALLBACK_MODEL_NAME);
}

#[test]
fn raw_table_sql_is_valid_with_warning() {
    let result = validate_sql("select * from orders", ValidationProfile::Generated);
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("{{ ref('model_name') }}"));
}

#[test]
fn non_select_sql_is_invalid() {
    let result = validate_sql("insert into x values (1)", ValidationProfile::Generated);
    assert!(!result.is_valid);
    assert!(result.errors.contains(&MISSING_SELECT_MESSAGE.to_string()));
}
