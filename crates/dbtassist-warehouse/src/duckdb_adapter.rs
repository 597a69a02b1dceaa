//! DuckDB preview adapter
//!
//! Opens the database file read-only for each preview, so a concurrent
//! `dbt run` holding the write lock only blocks previews while it runs.
//! Queries run on the blocking pool.

use crate::adapter::{PreviewAdapter, PreviewError, PreviewRows, Relation};
use std::path::{Path, PathBuf};

#[cfg(feature = "duckdb")]
use duckdb::types::{TimeUnit, ValueRef};

#[cfg(feature = "duckdb")]
use serde_json::Value;

/// DuckDB warehouse adapter
pub struct DuckDbAdapter {
    path: PathBuf,
}

impl DuckDbAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(feature = "duckdb")]
fn open(path: &Path) -> Result<duckdb::Connection, PreviewError> {
    if !path.exists() {
        return Err(PreviewError::ConnectionError(format!(
            "DuckDB file not found: {}",
            path.display()
        )));
    }

    let config = duckdb::Config::default()
        .access_mode(duckdb::AccessMode::ReadOnly)
        .map_err(|e| PreviewError::ConfigError(e.to_string()))?;

    duckdb::Connection::open_with_flags(path, config).map_err(|e| {
        PreviewError::ConnectionError(format!("Failed to open {}: {}", path.display(), e))
    })
}

#[cfg(feature = "duckdb")]
fn query_error(relation: &Relation, error: duckdb::Error) -> PreviewError {
    let message = error.to_string();
    if message.contains("does not exist") || message.contains("Catalog Error") {
        PreviewError::RelationNotFound(relation.to_string())
    } else {
        PreviewError::QueryError(message)
    }
}

#[cfg(feature = "duckdb")]
fn run_preview(path: &Path, relation: &Relation, limit: usize) -> Result<PreviewRows, PreviewError> {
    let conn = open(path)?;
    let sql = format!("SELECT * FROM {} LIMIT {}", relation, limit);

    let mut statement = conn.prepare(&sql).map_err(|e| query_error(relation, e))?;
    let mut rows = statement.query([]).map_err(|e| query_error(relation, e))?;
    let columns = rows
        .as_ref()
        .map(|statement| statement.column_names())
        .unwrap_or_default();

    let mut values = Vec::new();
    while let Some(row) = rows.next().map_err(|e| query_error(relation, e))? {
        let mut record = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value = row.get_ref(i).map_err(|e| query_error(relation, e))?;
            record.push(to_json(value));
        }
        values.push(record);
    }

    Ok(PreviewRows::from_values(columns, values))
}

#[cfg(feature = "duckdb")]
fn micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// JSON for one cell; anything without a JSON scalar form becomes a string
#[cfg(feature = "duckdb")]
fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(v) => Value::from(v),
        ValueRef::TinyInt(v) => Value::from(v),
        ValueRef::SmallInt(v) => Value::from(v),
        ValueRef::Int(v) => Value::from(v),
        ValueRef::BigInt(v) => Value::from(v),
        ValueRef::HugeInt(v) => i64::try_from(v)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(v.to_string())),
        ValueRef::UTinyInt(v) => Value::from(v),
        ValueRef::USmallInt(v) => Value::from(v),
        ValueRef::UInt(v) => Value::from(v),
        ValueRef::UBigInt(v) => Value::from(v),
        ValueRef::Float(v) => Value::from(f64::from(v)),
        ValueRef::Double(v) => Value::from(v),
        ValueRef::Decimal(v) => {
            let text = v.to_string();
            text.parse::<f64>()
                .map(Value::from)
                .unwrap_or(Value::String(text))
        }
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
        ValueRef::Date32(days) => chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(days))))
            .map(|date| Value::String(date.to_string()))
            .unwrap_or_else(|| Value::String(days.to_string())),
        ValueRef::Timestamp(unit, v) => chrono::DateTime::from_timestamp_micros(micros(unit, v))
            .map(|ts| Value::String(ts.naive_utc().to_string()))
            .unwrap_or_else(|| Value::String(v.to_string())),
        ValueRef::Time64(unit, v) => {
            let total = micros(unit, v);
            u32::try_from(total / 1_000_000)
                .ok()
                .and_then(|secs| {
                    let nanos = u32::try_from((total % 1_000_000) * 1_000).ok()?;
                    chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                })
                .map(|time| Value::String(time.to_string()))
                .unwrap_or_else(|| Value::String(v.to_string()))
        }
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{:?}", other)),
    }
}

#[async_trait::async_trait]
impl PreviewAdapter for DuckDbAdapter {
    fn name(&self) -> &'static str {
        "DuckDB"
    }

    #[cfg(feature = "duckdb")]
    async fn preview(&self, relation: &Relation, limit: usize) -> Result<PreviewRows, PreviewError> {
        let path = self.path.clone();
        let relation = relation.clone();

        let table = relation.to_string();
        let result = tokio::task::spawn_blocking(move || run_preview(&path, &relation, limit))
            .await
            .map_err(|e| PreviewError::QueryError(format!("Preview task failed: {}", e)))?;

        match &result {
            Ok(rows) => tracing::debug!(relation = %table, rows = rows.len(), "previewed relation"),
            Err(PreviewError::RelationNotFound(_)) => {
                tracing::warn!(relation = %table, "relation not found in DuckDB")
            }
            Err(e) => tracing::error!(relation = %table, path = %self.path.display(), error = %e, "DuckDB preview failed"),
        }
        result
    }

    #[cfg(not(feature = "duckdb"))]
    async fn preview(&self, _relation: &Relation, _limit: usize) -> Result<PreviewRows, PreviewError> {
        Err(PreviewError::ConfigError(
            "DuckDB support not compiled. Rebuild with: cargo build --features duckdb".to_string(),
        ))
    }

    #[cfg(feature = "duckdb")]
    async fn test_connection(&self) -> Result<(), PreviewError> {
        let path = self.path.clone();

        let result = tokio::task::spawn_blocking(move || open(&path).map(|_| ()))
            .await
            .map_err(|e| PreviewError::ConnectionError(format!("Connection task failed: {}", e)))?;

        // /health polls this, so failures stay at debug
        if let Err(e) = &result {
            tracing::debug!(path = %self.path.display(), error = %e, "DuckDB connection check failed");
        }
        result
    }

    #[cfg(not(feature = "duckdb"))]
    async fn test_connection(&self) -> Result<(), PreviewError> {
        Err(PreviewError::ConfigError(
            "DuckDB support not compiled. Rebuild with: cargo build --features duckdb".to_string(),
        ))
    }
}
