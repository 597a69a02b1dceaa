//! Preview adapter trait and the values it returns

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A validated, possibly schema-qualified relation name
///
/// Every part must be a plain identifier, so the name can be interpolated
/// into a query without quoting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    parts: Vec<String>,
}

impl Relation {
    /// Parse `table`, `schema.table` or `database.schema.table`
    pub fn parse(name: &str) -> Result<Self, PreviewError> {
        let parts: Vec<&str> = name.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 || !parts.iter().all(|p| is_identifier(p)) {
            return Err(PreviewError::InvalidRelation(name.to_string()));
        }

        Ok(Self {
            parts: parts.into_iter().map(str::to_string).collect(),
        })
    }

    /// Unqualified table name
    pub fn table(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Rows read from a relation, one JSON object per row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewRows {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl PreviewRows {
    /// Zip positional values with column names
    pub fn from_values(columns: Vec<String>, values: Vec<Vec<Value>>) -> Self {
        let rows = values
            .into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep at most `limit` rows
    pub fn truncated(mut self, limit: usize) -> Self {
        self.rows.truncate(limit);
        self
    }
}

/// Errors that can occur when previewing a relation
#[derive(Debug, Clone, thiserror::Error)]
pub enum PreviewError {
    #[error("Invalid relation name: {0}")]
    InvalidRelation(String),

    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Reads a bounded sample of rows from the warehouse
#[async_trait::async_trait]
pub trait PreviewAdapter: Send + Sync {
    /// Adapter name (e.g., "DuckDB")
    fn name(&self) -> &'static str;

    /// `SELECT * FROM <relation> LIMIT <limit>`
    async fn preview(&self, relation: &Relation, limit: usize) -> Result<PreviewRows, PreviewError>;

    /// Check the warehouse can be opened
    async fn test_connection(&self) -> Result<(), PreviewError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relation_names() {
        assert_eq!(Relation::parse("orders").unwrap().to_string(), "orders");
        let qualified = Relation::parse("main.stg_orders").unwrap();
        assert_eq!(qualified.table(), "stg_orders");
        assert_eq!(qualified.parts().len(), 2);
        assert!(Relation::parse("db.main.orders").is_ok());
    }

    #[test]
    fn rejects_anything_but_identifiers() {
        for name in ["", "orders; drop table x", "1orders", "a.b.c.d", "orders--", "a..b", "\"orders\""] {
            assert!(
                matches!(Relation::parse(name), Err(PreviewError::InvalidRelation(_))),
                "accepted {:?}",
                name
            );
        }
    }

    #[test]
    fn rows_from_values() {
        let rows = PreviewRows::from_values(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![json!(1), json!("a")], vec![json!(2), Value::Null]],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows[0]["name"], json!("a"));
        assert_eq!(rows.rows[1]["name"], Value::Null);
        assert_eq!(rows.truncated(1).len(), 1);
    }
}
