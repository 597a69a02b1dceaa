//! dbt console output parsing
//!
//! dbt's human-readable output is not a stable format. Everything here is a
//! best-effort scrape: error blocks separated by blank lines, WARN lines, and
//! the row count printed after a successful model build.

/// Advice when no pattern recognises an error
pub const GENERIC_SUGGESTION: &str = "Check your dbt project configuration, profiles.yml and model SQL";

/// Which dbt command produced the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Compile,
    Run,
}

/// Compile-phase error patterns, first match wins
const COMPILE_SUGGESTIONS: &[(&[&str], &str)] = &[
    (
        &["relation", "does not exist"],
        "Check that referenced tables/models exist and are spelled correctly",
    ),
    (&["column", "does not exist"], "Verify column names in your SELECT statement"),
    (&["syntax error"], "Check SQL syntax - missing commas, parentheses, or keywords"),
    (&["circular dependency"], "Remove circular references between models"),
    (
        &["compilation error", "macro"],
        "Check macro usage and ensure required macros are available",
    ),
    (&["jinja"], "Check Jinja template syntax in your model"),
];

/// Run-phase error patterns, first match wins
const EXECUTION_SUGGESTIONS: &[(&[&str], &str)] = &[
    (&["permission denied"], "Check database permissions for the target schema"),
    (
        &["table already exists"],
        "Consider using incremental materialization or dropping the existing table",
    ),
    (&["out of memory"], "Try processing smaller batches or optimizing the query"),
    (
        &["timeout"],
        "Query may be too complex - consider breaking it into smaller steps",
    ),
    (
        &["connection", "failed"],
        "Check database connection settings and network connectivity",
    ),
];

/// Error text split into blocks at blank lines
///
/// Lines starting with `[` (log prefixes) and the `Running with dbt` banner
/// are dropped; the remaining lines of a block are joined with spaces.
pub fn error_blocks(output: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in output.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        if line.starts_with('[') || line.starts_with("Running with dbt") {
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current.join(" "));
    }

    blocks
}

/// Suggestion for one error block, if a pattern matches
pub fn suggestion_for(error: &str, phase: Phase) -> Option<&'static str> {
    let table = match phase {
        Phase::Compile => COMPILE_SUGGESTIONS,
        Phase::Run => EXECUTION_SUGGESTIONS,
    };
    let lower = error.to_lowercase();
    table
        .iter()
        .find(|(needles, _)| needles.iter().all(|needle| lower.contains(needle)))
        .map(|(_, suggestion)| *suggestion)
}

/// Errors and deduplicated suggestions from a failed invocation
///
/// dbt 1.x logs errors to stdout, so stdout is used when stderr is empty.
/// When nothing is recognised the generic suggestion is added.
pub fn parse_failure(stdout: &str, stderr: &str, phase: Phase) -> (Vec<String>, Vec<String>) {
    let source = if stderr.trim().is_empty() { stdout } else { stderr };
    let errors = error_blocks(source);

    let mut suggestions: Vec<String> = Vec::new();
    for error in &errors {
        if let Some(suggestion) = suggestion_for(error, phase) {
            if !suggestions.iter().any(|s| s == suggestion) {
                suggestions.push(suggestion.to_string());
            }
        }
    }
    if suggestions.is_empty() {
        suggestions.push(GENERIC_SUGGESTION.to_string());
    }

    (errors, suggestions)
}

/// WARN lines with the marker removed
pub fn warnings(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("WARN"))
        .map(|line| line.replace("[WARNING]", "").replace("WARN", "").trim().to_string())
        .filter(|warning| !warning.is_empty())
        .collect()
}

/// Row count from an `OK created`/`OK inserted` line, e.g. `[SELECT 42 rows in 0.1s]`
pub fn rows_affected(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .filter(|line| line.contains("OK created") || line.contains("OK inserted"))
        .find_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            tokens.windows(2).find_map(|pair| {
                let count = pair[0].trim_start_matches('[');
                if pair[1].starts_with("row") && !count.is_empty() {
                    count.parse().ok()
                } else {
                    None
                }
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COMPILE_FAILURE: &str = "\
Running with dbt=1.7.4
[0m12:00:01  Registered adapter: duckdb=1.7.0

Compilation Error in model customers (models/customers.sql)
  Model 'model.jaffle.customers' depends on a node named 'ghost' which was not found

Database Error in model orders
  Catalog Error: relation \"raw_orders\" does not exist
";

    #[test]
    fn blocks_split_at_blank_lines() {
        let blocks = error_blocks(COMPILE_FAILURE);
        assert_eq!(
            blocks,
            vec![
                "Compilation Error in model customers (models/customers.sql) Model 'model.jaffle.customers' depends on a node named 'ghost' which was not found",
                "Database Error in model orders Catalog Error: relation \"raw_orders\" does not exist",
            ]
        );
    }

    #[test]
    fn compile_suggestions() {
        let (errors, suggestions) = parse_failure("", COMPILE_FAILURE, Phase::Compile);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            suggestions,
            vec!["Check that referenced tables/models exist and are spelled correctly"]
        );

        assert_eq!(
            suggestion_for("Compilation Error: macro 'foo' is undefined", Phase::Compile),
            Some("Check macro usage and ensure required macros are available")
        );
        assert_eq!(
            suggestion_for("unexpected jinja tag", Phase::Compile),
            Some("Check Jinja template syntax in your model")
        );
    }

    #[test]
    fn execution_suggestions() {
        assert_eq!(
            suggestion_for("ERROR: permission denied for schema analytics", Phase::Run),
            Some("Check database permissions for the target schema")
        );
        assert_eq!(
            suggestion_for("Connection to warehouse failed", Phase::Run),
            Some("Check database connection settings and network connectivity")
        );
        assert_eq!(suggestion_for("relation x does not exist", Phase::Run), None);
    }

    #[test]
    fn unrecognised_errors_get_generic_suggestion() {
        let (errors, suggestions) = parse_failure("something odd happened", "", Phase::Run);
        assert_eq!(errors, vec!["something odd happened"]);
        assert_eq!(suggestions, vec![GENERIC_SUGGESTION]);
    }

    #[test]
    fn warning_lines() {
        let stdout = "12:00  [WARNING]: Did not find matching node\nall good\n12:01 WARN deprecated config";
        assert_eq!(
            warnings(stdout),
            vec!["12:00  : Did not find matching node", "12:01  deprecated config"]
        );
    }

    #[test]
    fn row_counts() {
        let stdout = "\
1 of 1 START sql table model main.customers ... [RUN]
1 of 1 OK created sql table model main.customers ... [SELECT 42 rows in 0.10s]";
        assert_eq!(rows_affected(stdout), Some(42));
        assert_eq!(rows_affected("1 of 1 OK created sql view model main.x ... [OK in 0.05s]"), None);
        assert_eq!(rows_affected("OK inserted [1 row]"), Some(1));
    }
}
