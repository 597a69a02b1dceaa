//! Warehouse previews
//!
//! Reads a bounded sample of rows from a built model so the API can show
//! results after `dbt run`.
//!
//! ## Features
//!
//! - `duckdb` - DuckDB support (bundled engine)
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbtassist_warehouse::{DuckDbAdapter, PreviewAdapter, Relation};
//!
//! let adapter = DuckDbAdapter::new("warehouse.duckdb");
//! let rows = adapter.preview(&Relation::parse("customers")?, 100).await?;
//! ```

pub mod adapter;
pub mod duckdb_adapter;
pub mod mock;

pub use adapter::{PreviewAdapter, PreviewError, PreviewRows, Relation};
pub use duckdb_adapter::DuckDbAdapter;
pub use mock::MockAdapter;
