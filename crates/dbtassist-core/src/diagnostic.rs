//! Validation diagnostics
//!
//! Codes are stable string identifiers. Clients may key on them, so add new
//! codes rather than renaming existing ones.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// No SELECT keyword anywhere in the SQL
    MissingSelect,

    /// Table referenced by bare name instead of ref() or source()
    RawTableReference,

    /// Comma directly before FROM/WHERE/GROUP/ORDER/HAVING or a closing paren
    TrailingComma,

    /// Opening and closing parenthesis counts differ
    UnbalancedParentheses,

    /// Odd number of single or double quotes
    UnbalancedQuotes,

    /// `{{ ... }}` block with mismatched braces
    InvalidJinja,

    /// `materialized` mentioned outside a `{{ config() }}` block
    ConfigOutsideBlock,

    /// Model name or directory does not follow dbt conventions
    NamingConvention,

    /// `ref()` target that is not a model in the manifest
    UnknownRef,

    /// SQL structure hints (CTEs, comments)
    StyleHint,

    /// dbt compile reported a failure
    CompileFailure,

    /// Model file missing or unreadable
    FileError,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSelect => "MISSING_SELECT",
            Self::RawTableReference => "RAW_TABLE_REFERENCE",
            Self::TrailingComma => "TRAILING_COMMA",
            Self::UnbalancedParentheses => "UNBALANCED_PARENTHESES",
            Self::UnbalancedQuotes => "UNBALANCED_QUOTES",
            Self::InvalidJinja => "INVALID_JINJA",
            Self::ConfigOutsideBlock => "CONFIG_OUTSIDE_BLOCK",
            Self::NamingConvention => "NAMING_CONVENTION",
            Self::UnknownRef => "UNKNOWN_REF",
            Self::StyleHint => "STYLE_HINT",
            Self::CompileFailure => "COMPILE_FAILURE",
            Self::FileError => "FILE_ERROR",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
///
/// `Info` findings surface as suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,

    /// 1-indexed line, when the finding is tied to one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            line: None,
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, message)
    }

    /// Attach a line number
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Outcome of a validation pass
///
/// `is_valid` is false iff at least one error was reported. Warnings and
/// suggestions never invalidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,

    /// Structured form of the findings above
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Bucket diagnostics by severity
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let mut result = Self {
            is_valid: true,
            ..Self::default()
        };
        for diagnostic in diagnostics {
            result.push(diagnostic);
        }
        result
    }

    /// Add a finding, keeping the message buckets and `is_valid` in sync
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let bucket = match diagnostic.severity {
            Severity::Error => &mut self.errors,
            Severity::Warn => &mut self.warnings,
            Severity::Info => &mut self.suggestions,
        };
        bucket.push(diagnostic.message.clone());
        if diagnostic.severity == Severity::Error {
            self.is_valid = false;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Highest severity present, if any
    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        assert_eq!(DiagnosticCode::MissingSelect.as_str(), "MISSING_SELECT");
        assert_eq!(DiagnosticCode::RawTableReference.as_str(), "RAW_TABLE_REFERENCE");

        let json = serde_json::to_string(&DiagnosticCode::TrailingComma).unwrap();
        assert_eq!(json, "\"TRAILING_COMMA\"");
    }

    #[test]
    fn validation_result_buckets_by_severity() {
        let result = ValidationResult::from_diagnostics(vec![
            Diagnostic::warn(DiagnosticCode::RawTableReference, "use ref"),
            Diagnostic::info(DiagnosticCode::StyleHint, "add CTEs"),
        ]);

        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["use ref"]);
        assert_eq!(result.suggestions, vec!["add CTEs"]);
        assert_eq!(result.max_severity(), Some(Severity::Warn));
    }

    #[test]
    fn any_error_invalidates() {
        let mut result = ValidationResult::from_diagnostics(Vec::new());
        assert!(result.is_valid);
        assert_eq!(result.max_severity(), None);

        result.push(Diagnostic::error(DiagnosticCode::MissingSelect, "no select").at_line(1));
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["no select"]);
        assert_eq!(result.diagnostics[0].line, Some(1));
    }
}
