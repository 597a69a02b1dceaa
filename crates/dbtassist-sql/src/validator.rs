//! Shallow SQL validation
//!
//! Substring and counting heuristics only; nothing here parses SQL. A dbt
//! compile is the authoritative check and lives in the runner.
//!
//! The same checks run under two profiles. Generated SQL is advisory, so
//! structural problems are warnings. Model files on disk are what dbt will
//! build, so the same problems are errors there.

use dbtassist_core::{Diagnostic, DiagnosticCode, Layer, ModelLookup, Severity, ValidationResult};
use std::path::Path;

use crate::refs::unknown_refs;

pub const MISSING_SELECT_MESSAGE: &str = "Model must contain a SELECT statement";
pub const RAW_REFERENCE_MESSAGE: &str = "Consider using {{ ref('model_name') }} for dbt model references";

/// Keywords a dangling comma must not precede
const CLAUSE_STARTS: &[&str] = &["from", "where", "group", "order", "having", ")"];

/// Where the SQL under validation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationProfile {
    /// Freshly generated SQL shown to the user
    Generated,

    /// A model file on disk
    ModelFile,
}

impl ValidationProfile {
    fn structural_severity(&self) -> Severity {
        match self {
            Self::Generated => Severity::Warn,
            Self::ModelFile => Severity::Error,
        }
    }
}

/// Run the shared checks
pub fn validate_sql(sql: &str, profile: ValidationProfile) -> ValidationResult {
    let mut result = ValidationResult::from_diagnostics(Vec::new());
    for diagnostic in check_sql(sql, profile) {
        result.push(diagnostic);
    }
    result
}

/// Shared checks plus Jinja, config and naming checks for a model file
pub fn validate_model_file(path: &Path, content: &str) -> ValidationResult {
    let mut diagnostics = check_sql(content, ValidationProfile::ModelFile);
    diagnostics.extend(check_jinja(content));
    diagnostics.extend(check_config_usage(content));
    diagnostics.extend(check_naming(path));
    ValidationResult::from_diagnostics(diagnostics)
}

/// One warning per `ref()` target missing from the manifest
pub fn check_refs<L>(sql: &str, lookup: &L) -> Vec<Diagnostic>
where
    L: ModelLookup + ?Sized,
{
    unknown_refs(sql, lookup)
        .into_iter()
        .map(|name| {
            Diagnostic::warn(
                DiagnosticCode::UnknownRef,
                format!("Referenced model '{}' does not exist in the manifest", name),
            )
        })
        .collect()
}

/// Structure hints for LLM-written SQL
pub fn style_hints(sql: &str) -> Vec<Diagnostic> {
    let mut hints = Vec::new();
    let lower = sql.to_lowercase();

    if !lower.contains("with ") && sql.lines().count() > 10 {
        hints.push(Diagnostic::info(
            DiagnosticCode::StyleHint,
            "Consider using CTEs for better readability in complex queries",
        ));
    }
    if !sql.contains("--") && !sql.contains("/*") {
        hints.push(Diagnostic::info(
            DiagnosticCode::StyleHint,
            "Consider adding comments to explain business logic",
        ));
    }

    hints
}

fn check_sql(sql: &str, profile: ValidationProfile) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let lower = sql.to_lowercase();

    if !lower.contains("select") {
        diagnostics.push(Diagnostic::error(DiagnosticCode::MissingSelect, MISSING_SELECT_MESSAGE));
    }

    if lower.contains("from ") && !sql.contains("{{ ref(") && !sql.contains("{{ source(") {
        diagnostics.push(Diagnostic::warn(DiagnosticCode::RawTableReference, RAW_REFERENCE_MESSAGE));
    }

    diagnostics.extend(check_trailing_commas(sql));

    let code = strip_line_comments(sql);
    let severity = profile.structural_severity();

    if code.matches('(').count() != code.matches(')').count() {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::UnbalancedParentheses,
            severity,
            "Unmatched parentheses in SQL",
        ));
    }
    if code.matches('\'').count() % 2 != 0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::UnbalancedQuotes,
            severity,
            "Unmatched single quotes in SQL",
        ));
    }
    if code.matches('"').count() % 2 != 0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::UnbalancedQuotes,
            severity,
            "Unmatched double quotes in SQL",
        ));
    }

    diagnostics
}

fn check_trailing_commas(sql: &str) -> Vec<Diagnostic> {
    let lines: Vec<&str> = sql.lines().collect();
    let mut diagnostics = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !line.trim_end().ends_with(',') {
            continue;
        }
        let next = lines[i + 1..]
            .iter()
            .map(|l| l.trim().to_lowercase())
            .find(|l| !l.is_empty());
        if let Some(next) = next {
            if CLAUSE_STARTS.iter().any(|kw| next.starts_with(kw)) {
                diagnostics.push(
                    Diagnostic::warn(
                        DiagnosticCode::TrailingComma,
                        format!("Trailing comma on line {} may cause issues", i + 1),
                    )
                    .at_line(i + 1),
                );
            }
        }
    }

    diagnostics
}

/// SQL with `--` comments removed; a `--` inside a quoted literal is kept
fn strip_line_comments(sql: &str) -> String {
    let mut code = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                code.push(c);
            }
            continue;
        }
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '-' && chars.peek() == Some(&'-') => {
                in_comment = true;
                continue;
            }
            None => {}
        }
        code.push(c);
    }

    code
}

fn check_jinja(content: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (open, close) in [("{{", "}}"), ("{%", "%}")] {
        let opened = content.matches(open).count();
        let closed = content.matches(close).count();
        if opened != closed {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::InvalidJinja,
                format!(
                    "Invalid Jinja syntax: {} '{}' but {} '{}'",
                    opened, open, closed, close
                ),
            ));
        }
    }

    diagnostics
}

fn check_config_usage(content: &str) -> Vec<Diagnostic> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    if content.contains("materialized") && !compact.contains("{{config(") {
        return vec![Diagnostic::info(
            DiagnosticCode::ConfigOutsideBlock,
            "Use {{ config() }} block for model configuration",
        )];
    }
    Vec::new()
}

fn check_naming(path: &Path) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        return diagnostics;
    };

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        diagnostics.push(Diagnostic::warn(
            DiagnosticCode::NamingConvention,
            "Model name should only contain letters, numbers, and underscores",
        ));
    }

    let directory = path.parent().map(|p| p.to_string_lossy().to_string()).unwrap_or_default();
    let expected = match Layer::for_new_model(name) {
        Layer::Staging if name.starts_with("stg_") => Some(("staging", "Staging models (stg_*) should be in staging directory")),
        Layer::Marts => Some(("marts", "Mart models should be in marts directory")),
        _ if name.starts_with("int_") => {
            Some(("intermediate", "Intermediate models (int_*) should be in intermediate directory"))
        }
        _ => None,
    };
    if let Some((dir, message)) = expected {
        if !directory.contains(dir) {
            diagnostics.push(Diagnostic::info(DiagnosticCode::NamingConvention, message));
        }
    }

    diagnostics
}
