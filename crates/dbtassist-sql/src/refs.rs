//! dbt reference extraction
//!
//! Finds `{{ ref('model') }}` and `{{ source('source', 'table') }}` calls in
//! model SQL without parsing the SQL itself.

use dbtassist_core::ModelLookup;

/// A reference to a dbt model or source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbtReference {
    /// ref('model_name') or ref('package', 'model_name')
    Ref {
        package: Option<String>,
        model_name: String,
    },

    /// source('source_name', 'table_name')
    Source {
        source_name: String,
        table_name: String,
    },
}

impl DbtReference {
    /// The Jinja call as dbt users write it
    pub fn to_jinja(&self) -> String {
        match self {
            Self::Ref {
                package: Some(package),
                model_name,
            } => format!("{{{{ ref('{}', '{}') }}}}", package, model_name),
            Self::Ref { model_name, .. } => format!("{{{{ ref('{}') }}}}", model_name),
            Self::Source {
                source_name,
                table_name,
            } => format!("{{{{ source('{}', '{}') }}}}", source_name, table_name),
        }
    }
}

/// Every ref() and source() call, in order of appearance
pub fn extract(sql: &str) -> Vec<DbtReference> {
    let mut references = Vec::new();

    let mut start = 0;
    while let Some(open) = sql[start..].find("{{") {
        let open_pos = start + open;
        let Some(close) = sql[open_pos..].find("}}") else {
            break;
        };
        let close_pos = open_pos + close;
        let content = sql[open_pos + 2..close_pos].trim();

        if let Some(reference) = parse_ref(content).or_else(|| parse_source(content)) {
            references.push(reference);
        }

        start = close_pos + 2;
    }

    references
}

/// Model names passed to ref() that the lookup does not know, deduplicated
pub fn unknown_refs<L>(sql: &str, lookup: &L) -> Vec<String>
where
    L: ModelLookup + ?Sized,
{
    let mut unknown: Vec<String> = Vec::new();
    for reference in extract(sql) {
        if let DbtReference::Ref { model_name, .. } = reference {
            if !lookup.is_model(&model_name) && !unknown.contains(&model_name) {
                unknown.push(model_name);
            }
        }
    }
    unknown
}

fn call_arguments<'a>(content: &'a str, function: &str) -> Option<Vec<&'a str>> {
    let inner = content
        .strip_prefix(function)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    inner.split(',').map(string_literal).collect()
}

fn parse_ref(content: &str) -> Option<DbtReference> {
    match call_arguments(content, "ref")?.as_slice() {
        [model_name] => Some(DbtReference::Ref {
            package: None,
            model_name: model_name.to_string(),
        }),
        [package, model_name] => Some(DbtReference::Ref {
            package: Some(package.to_string()),
            model_name: model_name.to_string(),
        }),
        _ => None,
    }
}

fn parse_source(content: &str) -> Option<DbtReference> {
    match call_arguments(content, "source")?.as_slice() {
        [source_name, table_name] => Some(DbtReference::Source {
            source_name: source_name.to_string(),
            table_name: table_name.to_string(),
        }),
        _ => None,
    }
}

/// Content of a single- or double-quoted literal
fn string_literal(s: &str) -> Option<&str> {
    let trimmed = s.trim();

    if let Some(content) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Some(content);
    }

    if let Some(content) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Some(content);
    }

    None
}
