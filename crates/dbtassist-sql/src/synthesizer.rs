//! CTE-based SQL skeletons from a prompt analysis
//!
//! Synthesis is string assembly over fixed templates, one per intent. It never
//! fails: a prompt with no usable tables produces placeholder SQL.

use dbtassist_core::Materialization;
use dbtassist_prompt::{IntentType, JoinType, PromptAnalysis, TableReference};
use serde::{Deserialize, Serialize};

/// Fixed confidence reported for pattern-based synthesis
pub const PATTERN_CONFIDENCE: f64 = 0.8;

pub const PATTERN_REASONING: &str = "Generated from prompt patterns and manifest lookups";

/// Name used when the prompt gives nothing to derive one from
pub const FALLBACK_MODEL_NAME: &str = "generated_model";

const PLACEHOLDER_SQL: [&str; 3] = [
    "-- No table references found in prompt",
    "-- Please specify which tables or models to use",
    "select 1 as placeholder",
];

/// A generated model, ready to be written or validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlGenerationResult {
    pub sql: String,
    pub model_name: String,
    pub description: Option<String>,
    pub materialization: Materialization,
    pub confidence: f64,
    pub reasoning: Option<String>,

    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Build the SQL skeleton and model metadata for an analysis
pub fn synthesize(analysis: &PromptAnalysis) -> SqlGenerationResult {
    let mut warnings = Vec::new();
    let mut lines = config_block(analysis.materialization);

    let refs = &analysis.table_references;
    if refs.is_empty() {
        lines.extend(PLACEHOLDER_SQL.iter().map(|line| line.to_string()));
        warnings.push("No table references found in prompt; generated placeholder SQL".to_string());
    } else {
        let body = match (analysis.intent, refs.as_slice()) {
            (IntentType::JoinTables, [left, right, ..]) => {
                warnings.push("Join condition defaults to `id`; adjust it to the real join key".to_string());
                join_sql(left, right, join_type(analysis), &analysis.filters)
            }
            (IntentType::AggregateData, [source, ..]) => aggregate_sql(source, &analysis.aggregations),
            (IntentType::FilterData, [source, ..]) => filter_sql(source, &analysis.filters),
            (IntentType::TransformData, [source, ..]) => transform_sql(source, &analysis.transformations),
            (_, [source, ..]) => vec![format!("select * from {}", relation(source))],
            (_, []) => Vec::new(),
        };
        lines.extend(body);

        let used = match analysis.intent {
            IntentType::JoinTables => refs.len().min(2),
            _ => 1,
        };
        for reference in refs.iter().take(used).filter(|r| !r.is_model) {
            warnings.push(format!(
                "`{}` is not a model in the manifest; it is referenced as a raw table",
                reference.name
            ));
        }
    }

    let result = SqlGenerationResult {
        sql: lines.join("\n"),
        model_name: model_name(analysis),
        description: analysis.description.clone(),
        materialization: analysis.materialization,
        confidence: PATTERN_CONFIDENCE,
        reasoning: Some(PATTERN_REASONING.to_string()),
        warnings,
    };

    tracing::debug!(model = %result.model_name, intent = %analysis.intent, "synthesized SQL skeleton");
    result
}

/// Output name, else an intent prefix on the first table, else the fallback
pub fn model_name(analysis: &PromptAnalysis) -> String {
    if let Some(name) = &analysis.output_name {
        return name.clone();
    }

    let Some(first) = analysis.table_references.first() else {
        return FALLBACK_MODEL_NAME.to_string();
    };

    let prefix = match analysis.intent {
        IntentType::JoinTables => "joined",
        IntentType::AggregateData => "agg",
        IntentType::FilterData => "filtered",
        IntentType::TransformData => "transformed",
        _ => "new",
    };
    format!("{}_{}", prefix, first.name)
}

/// `{{ ref('name') }}` for known models, the bare name otherwise
pub fn relation(reference: &TableReference) -> String {
    if reference.is_model {
        format!("{{{{ ref('{}') }}}}", reference.name)
    } else {
        reference.name.clone()
    }
}

fn join_type(analysis: &PromptAnalysis) -> JoinType {
    analysis
        .join_requirements
        .first()
        .map(|join| join.join_type)
        .unwrap_or_default()
}

fn config_block(materialization: Materialization) -> Vec<String> {
    if materialization == Materialization::View {
        return Vec::new();
    }

    vec![
        "{{".to_string(),
        "  config(".to_string(),
        format!("    materialized='{}'", materialization),
        "  )".to_string(),
        "}}".to_string(),
        String::new(),
    ]
}

fn source_cte(source: &TableReference) -> Vec<String> {
    vec![
        "with".to_string(),
        String::new(),
        "source_data as (".to_string(),
        format!("  select * from {}", relation(source)),
        "),".to_string(),
        String::new(),
    ]
}

fn where_clause(lines: &mut Vec<String>, filters: &[String]) {
    if filters.is_empty() {
        return;
    }

    lines.push("  where".to_string());
    for (i, condition) in filters.iter().enumerate() {
        let prefix = if i == 0 { "    " } else { "    and " };
        lines.push(format!("{}{}", prefix, condition));
    }
}

/// Drop the trailing comma of the last SQL line, skipping comment lines
fn strip_trailing_comma(lines: &mut [String]) {
    let last_sql = lines
        .iter_mut()
        .rev()
        .find(|line| !line.trim_start().starts_with("--"));
    if let Some(line) = last_sql {
        if line.ends_with(',') {
            line.pop();
        }
    }
}

fn join_sql(left: &TableReference, right: &TableReference, join_type: JoinType, filters: &[String]) -> Vec<String> {
    let mut lines = vec![
        "with".to_string(),
        String::new(),
        "left_table as (".to_string(),
        format!("  select * from {}", relation(left)),
        "),".to_string(),
        String::new(),
        "right_table as (".to_string(),
        format!("  select * from {}", relation(right)),
        "),".to_string(),
        String::new(),
        "final as (".to_string(),
        "  select".to_string(),
        "    left_table.*,".to_string(),
        "    right_table.*".to_string(),
        "  from left_table".to_string(),
        format!("  {} join right_table", join_type),
        "    on left_table.id = right_table.id  -- Adjust join condition as needed".to_string(),
    ];
    where_clause(&mut lines, filters);
    lines.extend([")".to_string(), String::new(), "select * from final".to_string()]);
    lines
}

fn aggregate_sql(source: &TableReference, aggregations: &[String]) -> Vec<String> {
    let mut lines = source_cte(source);
    lines.extend(["aggregated as (".to_string(), "  select".to_string()]);

    if aggregations.is_empty() {
        lines.push("    count(*) as row_count,".to_string());
        lines.push("    count(distinct id) as unique_ids  -- Adjust columns as needed".to_string());
    } else {
        lines.extend(aggregations.iter().map(|agg| format!("    {},", agg)));
    }
    strip_trailing_comma(&mut lines);

    lines.push("  from source_data".to_string());
    if aggregations.iter().any(|agg| agg.to_lowercase().contains("group by")) {
        lines.push("  group by 1  -- Adjust grouping columns as needed".to_string());
    }
    lines.extend([")".to_string(), String::new(), "select * from aggregated".to_string()]);
    lines
}

fn filter_sql(source: &TableReference, filters: &[String]) -> Vec<String> {
    let mut lines = source_cte(source);
    lines.extend([
        "filtered as (".to_string(),
        "  select *".to_string(),
        "  from source_data".to_string(),
    ]);
    where_clause(&mut lines, filters);
    lines.extend([")".to_string(), String::new(), "select * from filtered".to_string()]);
    lines
}

fn transform_sql(source: &TableReference, transformations: &[String]) -> Vec<String> {
    let mut lines = source_cte(source);
    lines.extend([
        "transformed as (".to_string(),
        "  select".to_string(),
        "    *,".to_string(),
    ]);

    if transformations.is_empty() {
        lines.push("    current_timestamp as processed_at".to_string());
    } else {
        for transform in transformations {
            let lower = transform.to_lowercase();
            let placeholder = if lower.contains("calculate") {
                "    -- Add calculated fields here"
            } else if lower.contains("convert") {
                "    -- Add conversion logic here"
            } else if lower.contains("column") || lower.contains("field") {
                "    -- Add new column here"
            } else {
                continue;
            };
            lines.push(placeholder.to_string());
        }
    }
    strip_trailing_comma(&mut lines);

    lines.extend([
        "  from source_data".to_string(),
        ")".to_string(),
        String::new(),
        "select * from transformed".to_string(),
    ]);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtassist_prompt::JoinRequirement;
    use pretty_assertions::assert_eq;

    fn table(name: &str, is_model: bool) -> TableReference {
        TableReference {
            name: name.to_string(),
            alias: None,
            is_model,
            confidence: if is_model { 0.8 } else { 0.6 },
        }
    }

    fn analysis(intent: IntentType, refs: Vec<TableReference>) -> PromptAnalysis {
        PromptAnalysis {
            intent,
            table_references: refs,
            ..PromptAnalysis::empty()
        }
    }

    #[test]
    fn join_skeleton() {
        let mut a = analysis(
            IntentType::JoinTables,
            vec![table("customers", true), table("orders", true)],
        );
        a.join_requirements.push(JoinRequirement {
            left_table: "customers".to_string(),
            right_table: "orders".to_string(),
            join_type: JoinType::Inner,
            join_condition: None,
            confidence: 0.7,
        });

        let result = synthesize(&a);
        let expected = "\
with

left_table as (
  select * from {{ ref('customers') }}
),

right_table as (
  select * from {{ ref('orders') }}
),

final as (
  select
    left_table.*,
    right_table.*
  from left_table
  inner join right_table
    on left_table.id = right_table.id  -- Adjust join condition as needed
)

select * from final";
        assert_eq!(result.sql, expected);
        assert_eq!(result.sql.matches("final as (").count(), 1);
        assert_eq!(result.model_name, "joined_customers");
        assert_eq!(result.confidence, PATTERN_CONFIDENCE);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn join_with_filters_and_raw_table() {
        let mut a = analysis(
            IntentType::JoinTables,
            vec![table("customers", true), table("raw_orders", false)],
        );
        a.filters = vec!["status = 'paid'".to_string(), "amount > 0".to_string()];

        let result = synthesize(&a);
        assert!(result.sql.contains("  select * from raw_orders\n"));
        assert!(result.sql.contains("  where\n    status = 'paid'\n    and amount > 0\n)"));
        assert!(result.warnings.iter().any(|w| w.contains("`raw_orders`")));
    }

    #[test]
    fn join_with_one_table_falls_back_to_select() {
        let result = synthesize(&analysis(IntentType::JoinTables, vec![table("orders", true)]));
        assert_eq!(result.sql, "select * from {{ ref('orders') }}");
        assert_eq!(result.model_name, "joined_orders");
    }

    #[test]
    fn placeholder_without_tables() {
        let result = synthesize(&PromptAnalysis::empty());
        assert_eq!(
            result.sql,
            "-- No table references found in prompt\n-- Please specify which tables or models to use\nselect 1 as placeholder"
        );
        assert_eq!(result.model_name, FALLBACK_MODEL_NAME);

        let aggregate = synthesize(&analysis(IntentType::AggregateData, Vec::new()));
        assert!(aggregate.sql.ends_with("select 1 as placeholder"));
    }

    #[test]
    fn aggregate_defaults_and_group_by() {
        let result = synthesize(&analysis(IntentType::AggregateData, vec![table("orders", true)]));
        assert!(result.sql.contains("    count(*) as row_count,\n    count(distinct id) as unique_ids"));
        assert!(!result.sql.contains("group by"));
        assert!(result.sql.ends_with("select * from aggregated"));
        assert_eq!(result.model_name, "agg_orders");

        let mut a = analysis(IntentType::AggregateData, vec![table("orders", true)]);
        a.aggregations = vec!["sum of amount".to_string(), "group by customer_id".to_string()];
        let result = synthesize(&a);
        assert!(result.sql.contains("    sum of amount,\n    group by customer_id\n  from source_data\n  group by 1"));
    }

    #[test]
    fn filter_skeleton() {
        let mut a = analysis(IntentType::FilterData, vec![table("orders", true)]);
        a.filters = vec!["status = 'paid'".to_string()];
        let result = synthesize(&a);
        assert!(result.sql.contains("filtered as (\n  select *\n  from source_data\n  where\n    status = 'paid'\n)"));
        assert_eq!(result.model_name, "filtered_orders");
    }

    #[test]
    fn transform_placeholders_keep_sql_valid() {
        let result = synthesize(&analysis(IntentType::TransformData, vec![table("orders", true)]));
        assert!(result.sql.contains("    *,\n    current_timestamp as processed_at\n  from source_data"));

        let mut a = analysis(IntentType::TransformData, vec![table("orders", true)]);
        a.transformations = vec!["convert cents to dollars".to_string()];
        let result = synthesize(&a);
        assert!(result.sql.contains("    *\n    -- Add conversion logic here\n  from source_data"));
    }

    #[test]
    fn config_block_only_for_non_view() {
        let mut a = analysis(IntentType::CreateModel, vec![table("orders", true)]);
        assert!(!synthesize(&a).sql.contains("config("));

        a.materialization = Materialization::Table;
        a.output_name = Some("fct_orders".to_string());
        let result = synthesize(&a);
        assert!(result.sql.starts_with("{{\n  config(\n    materialized='table'\n  )\n}}\n\nselect * from"));
        assert_eq!(result.model_name, "fct_orders");
        assert_eq!(result.materialization, Materialization::Table);
    }

    #[test]
    fn create_intent_uses_new_prefix() {
        let result = synthesize(&analysis(IntentType::CreateModel, vec![table("payments", false)]));
        assert_eq!(result.sql, "select * from payments");
        assert_eq!(result.model_name, "new_payments");
    }
}
