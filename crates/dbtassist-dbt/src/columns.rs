//! Column inference for models without documented columns
//!
//! This is a heuristic, not a parser: the select list is everything between
//! the first SELECT and the next FROM, split on every comma. Expressions with
//! commas inside them (`coalesce(a, b)`) are mis-split.

use dbtassist_core::ColumnInfo;

pub const INFERRED_DESCRIPTION: &str =
    "Inferred from SQL (run dbt docs generate for accurate schema)";

const AGGREGATES: [&str; 5] = ["COUNT(", "SUM(", "AVG(", "MAX(", "MIN("];

/// Guess output columns from a SQL body
pub fn infer_columns(sql: &str) -> Vec<ColumnInfo> {
    // ASCII uppercasing keeps byte offsets aligned with `sql`
    let upper = sql.to_ascii_uppercase();

    let Some(select_at) = upper.find("SELECT") else {
        return Vec::new();
    };
    let Some(from_offset) = upper[select_at..].find("FROM") else {
        return Vec::new();
    };
    let from_at = select_at + from_offset;
    if from_at < select_at + 6 {
        return Vec::new();
    }

    sql[select_at + 6..from_at]
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(column_name)
        .map(|name| name.replace(['"', '\'', '`'], ""))
        .filter(|name| !name.is_empty() && name != "*")
        .map(|name| ColumnInfo {
            name,
            data_type: "unknown".to_string(),
            description: Some(INFERRED_DESCRIPTION.to_string()),
            tests: Vec::new(),
        })
        .collect()
}

/// Output name of one select-list entry
fn column_name(part: &str) -> String {
    let upper = part.to_ascii_uppercase();

    if let Some(at) = upper.find(" AS ") {
        return part[at + 4..].trim().to_string();
    }

    if part.contains(' ') && !AGGREGATES.iter().any(|f| upper.contains(f)) {
        if let Some(last) = part.split_whitespace().last() {
            return last.to_string();
        }
    }

    part.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sql: &str) -> Vec<String> {
        infer_columns(sql).into_iter().map(|c| c.name).collect()
    }

    #[test]
    fn plain_and_aliased_columns() {
        assert_eq!(
            names("select id, first_name as name, o.amount total from orders o"),
            vec!["id", "name", "total"]
        );
    }

    #[test]
    fn alias_keeps_original_case() {
        assert_eq!(names("SELECT order_id AS OrderId FROM x"), vec!["OrderId"]);
    }

    #[test]
    fn aggregate_without_alias_keeps_expression() {
        assert_eq!(names("select count(*) from orders"), vec!["count(*)"]);
    }

    #[test]
    fn star_and_quotes() {
        assert_eq!(names("select *, \"status\" from orders"), vec!["status"]);
    }

    #[test]
    fn no_select_or_from_yields_nothing() {
        assert!(names("insert into x values (1)").is_empty());
        assert!(names("select 1").is_empty());
    }

    #[test]
    fn inferred_columns_are_marked() {
        let columns = infer_columns("select id from t");
        assert_eq!(columns[0].data_type, "unknown");
        assert_eq!(columns[0].description.as_deref(), Some(INFERRED_DESCRIPTION));
    }

    #[test]
    fn commas_inside_calls_are_mis_split() {
        // Known limitation of the comma split
        assert_eq!(
            names("select coalesce(a, b) as c from t"),
            vec!["coalesce(a", "c"]
        );
    }
}
