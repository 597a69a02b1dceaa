//! dbtassist runner
//!
//! Wraps the dbt CLI: `dbt compile` and `dbt run` invocations with a timeout,
//! scraping of their console output into errors, warnings and suggestions,
//! and an optional warehouse preview of freshly built models.

pub mod command;
pub mod output;
pub mod results;
pub mod service;

pub use command::{CommandOutput, DbtCli, DbtExecutor, RunnerError};
pub use output::{Phase, GENERIC_SUGGESTION};
pub use results::{CompilationResult, CompileAndRunResult, ExecutionResult};
pub use service::DbtRunner;
