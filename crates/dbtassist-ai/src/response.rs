//! Turning a chat completion into a model

use dbtassist_core::{Materialization, ModelLookup};
use dbtassist_sql::{check_refs, style_hints, validate_sql, ValidationProfile};

/// Name used when no keyword in the prompt suggests one
pub const FALLBACK_CHATGPT_MODEL_NAME: &str = "chatgpt_generated_model";

/// Drop a surrounding markdown code fence, if the model added one
pub fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|line| line.trim() == "```") {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Model name from prompt keywords
pub fn infer_model_name(prompt: &str) -> String {
    let prompt = prompt.to_lowercase();
    let has = |word: &str| prompt.contains(word);

    let name = if has("revenue") {
        if has("daily") {
            "daily_revenue_analysis"
        } else if has("monthly") {
            "monthly_revenue_analysis"
        } else {
            "revenue_analysis"
        }
    } else if has("customer") {
        if has("lifetime") || has("ltv") {
            "customer_lifetime_value"
        } else if has("segment") {
            "customer_segmentation"
        } else {
            "customer_analysis"
        }
    } else if has("order") {
        if has("funnel") {
            "order_funnel_analysis"
        } else {
            "order_analysis"
        }
    } else if has("product") {
        "product_analysis"
    } else {
        FALLBACK_CHATGPT_MODEL_NAME
    };

    name.to_string()
}

/// Materialization from the first `materialized=` line; view otherwise
pub fn extract_materialization(sql: &str) -> Materialization {
    let Some(line) = sql
        .lines()
        .map(|line| line.replace(' ', ""))
        .find(|line| line.contains("materialized="))
    else {
        return Materialization::View;
    };

    [
        Materialization::Table,
        Materialization::Incremental,
        Materialization::Ephemeral,
    ]
    .into_iter()
    .find(|m| {
        line.contains(&format!("'{}'", m.as_str())) || line.contains(&format!("\"{}\"", m.as_str()))
    })
    .unwrap_or(Materialization::View)
}

/// Warnings and suggestions for SQL an LLM wrote
///
/// Every shallow validator finding is a warning here, since the SQL is only
/// a proposal. Refs to models missing from the manifest are flagged too.
pub fn review<L>(sql: &str, models: &L) -> (Vec<String>, Vec<String>)
where
    L: ModelLookup + ?Sized,
{
    let validation = validate_sql(sql, ValidationProfile::Generated);
    let mut warnings: Vec<String> = validation.errors.into_iter().chain(validation.warnings).collect();
    warnings.extend(check_refs(sql, models).into_iter().map(|d| d.message));

    let mut suggestions = validation.suggestions;
    suggestions.extend(style_hints(sql).into_iter().map(|d| d.message));

    (warnings, suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtassist_core::ManifestModel;
    use pretty_assertions::assert_eq;

    #[test]
    fn fences() {
        assert_eq!(strip_code_fences("```sql\nselect 1\n```"), "select 1");
        assert_eq!(strip_code_fences("```\nselect 1\n```\n"), "select 1");
        assert_eq!(strip_code_fences("  select 1  "), "select 1");
        assert_eq!(strip_code_fences("```sql\nselect 1"), "select 1");
    }

    #[test]
    fn names_from_keywords() {
        assert_eq!(infer_model_name("Daily revenue by product"), "daily_revenue_analysis");
        assert_eq!(infer_model_name("monthly revenue"), "monthly_revenue_analysis");
        assert_eq!(infer_model_name("total revenue"), "revenue_analysis");
        assert_eq!(infer_model_name("customer LTV"), "customer_lifetime_value");
        assert_eq!(infer_model_name("segment our customers"), "customer_segmentation");
        assert_eq!(infer_model_name("customers by country"), "customer_analysis");
        assert_eq!(infer_model_name("order funnel"), "order_funnel_analysis");
        assert_eq!(infer_model_name("orders per week"), "order_analysis");
        assert_eq!(infer_model_name("top products"), "product_analysis");
        assert_eq!(infer_model_name("payments"), FALLBACK_CHATGPT_MODEL_NAME);
    }

    #[test]
    fn materialization_from_config() {
        assert_eq!(
            extract_materialization("{{\n  config(materialized='table')\n}}\nselect 1"),
            Materialization::Table
        );
        assert_eq!(
            extract_materialization("{{ config(materialized = \"incremental\") }}"),
            Materialization::Incremental
        );
        assert_eq!(extract_materialization("{{ config(materialized='view') }}"), Materialization::View);
        assert_eq!(extract_materialization("select 1"), Materialization::View);
    }

    #[test]
    fn review_flags_unknown_refs_and_missing_comments() {
        let models = vec![ManifestModel::new("orders", "models/orders.sql")];
        let sql = "select * from {{ ref('orders') }} join {{ ref('ghost') }} using (id)";

        let (warnings, suggestions) = review(sql, &models);
        assert_eq!(warnings, vec!["Referenced model 'ghost' does not exist in the manifest"]);
        assert_eq!(suggestions, vec!["Consider adding comments to explain business logic"]);
    }

    #[test]
    fn review_reports_missing_select_as_warning() {
        let (warnings, _) = review("delete from orders", &Vec::<ManifestModel>::new());
        assert!(warnings.contains(&"Model must contain a SELECT statement".to_string()));
    }
}
