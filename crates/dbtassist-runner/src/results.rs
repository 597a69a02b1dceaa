//! Outcomes of compile and run requests
//!
//! Failures are data here, not `Err`: a model that does not compile still
//! produces a [`CompilationResult`] with the parsed errors and suggestions.

use dbtassist_core::{Diagnostic, DiagnosticCode, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationResult {
    pub success: bool,
    pub model_name: String,
    pub compiled_sql: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,

    /// Seconds
    pub compilation_time: Option<f64>,
}

impl CompilationResult {
    pub(crate) fn failure(model_name: &str, error: String, suggestion: &str, elapsed: f64) -> Self {
        Self {
            success: false,
            model_name: model_name.to_string(),
            errors: vec![error],
            suggestions: vec![suggestion.to_string()],
            compilation_time: Some(elapsed),
            ..Self::default()
        }
    }

    /// dbt's verdict as a validation result; valid iff dbt reported no errors
    pub fn into_validation(self) -> ValidationResult {
        let diagnostics = self
            .errors
            .into_iter()
            .map(|e| Diagnostic::error(DiagnosticCode::CompileFailure, e))
            .chain(
                self.warnings
                    .into_iter()
                    .map(|w| Diagnostic::warn(DiagnosticCode::CompileFailure, w)),
            )
            .chain(
                self.suggestions
                    .into_iter()
                    .map(|s| Diagnostic::info(DiagnosticCode::CompileFailure, s)),
            )
            .collect();

        ValidationResult::from_diagnostics(diagnostics)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub model_name: String,
    pub rows_affected: Option<u64>,

    /// Seconds
    pub execution_time: Option<f64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,

    /// First rows of the built relation, when a preview adapter is configured
    pub preview_data: Option<Vec<Map<String, Value>>>,
}

impl ExecutionResult {
    pub(crate) fn failure(model_name: &str, error: String, suggestion: &str, elapsed: f64) -> Self {
        Self {
            success: false,
            model_name: model_name.to_string(),
            errors: vec![error],
            suggestions: vec![suggestion.to_string()],
            execution_time: Some(elapsed),
            ..Self::default()
        }
    }
}

/// Compilation, plus execution when compilation succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileAndRunResult {
    pub compilation: CompilationResult,
    pub execution: Option<ExecutionResult>,
}

impl CompileAndRunResult {
    pub fn success(&self) -> bool {
        self.compilation.success && self.execution.as_ref().is_some_and(|e| e.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_as_validation() {
        let ok = CompilationResult {
            success: true,
            warnings: vec!["WARN deprecated config".to_string()],
            ..CompilationResult::default()
        };
        let result = ok.into_validation();
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["WARN deprecated config"]);

        let failed = CompilationResult::failure("orders", "Compilation Error".to_string(), "Check the SQL", 0.1);
        let result = failed.into_validation();
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Compilation Error"]);
        assert_eq!(result.suggestions, vec!["Check the SQL"]);
    }
}
