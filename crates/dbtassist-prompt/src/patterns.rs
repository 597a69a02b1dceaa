//! Pattern tables and the matcher that consumes them
//!
//! Every table is plain data. Adding a phrasing means adding a row here; the
//! classifier and extractor never special-case individual patterns. All
//! patterns are compiled case-insensitively.

use dbtassist_core::Materialization;
use regex::{Regex, RegexBuilder};

use crate::analysis::JoinType;
use crate::intent::IntentType;

/// Intent tables, in tie-break order
pub const INTENT_PATTERNS: &[(IntentType, &[&str])] = &[
    (
        IntentType::CreateModel,
        &[
            r"\bcreate\s+(?:a\s+)?(?:new\s+)?model",
            r"\bbuild\s+(?:a\s+)?(?:new\s+)?model",
            r"\bgenerate\s+(?:a\s+)?(?:new\s+)?model",
            r"\bmake\s+(?:a\s+)?(?:new\s+)?model",
            r"\bi\s+(?:want|need)\s+(?:a\s+)?(?:new\s+)?model",
        ],
    ),
    (
        IntentType::JoinTables,
        &[
            r"\bjoin(?:s|ed|ing)?\s+\w+\s+(?:with|and|to)\s+\w+",
            r"\bcombin(?:e|es|ed|ing)\s+\w+\s+(?:with|and)\s+\w+",
            r"\bmerg(?:e|es|ed|ing)\s+\w+\s+(?:with|and)\s+\w+",
            r"\b(?:inner|left|right|full)\s+(?:outer\s+)?join",
            r"\bconnect(?:s|ed|ing)?\s+\w+\s+(?:with|and|to)\s+\w+",
            r"\bjoin(?:s|ed|ing)?\b",
        ],
    ),
    (
        IntentType::AggregateData,
        &[
            r"\b(?:sum|counts?|avg|average|min|max|minimum|maximum)\b|\bgroup\s+by\b",
            r"\baggregat(?:e|es|ed|ion)\b",
            r"\btotal\s+",
            r"\bcalculate\s+(?:the\s+)?(?:sum|count|average|total)",
            r"\bgroup\s+.*\s+by\b",
        ],
    ),
    (
        IntentType::FilterData,
        &[
            r"\bfilter\s+",
            r"\bwhere\s+",
            r"\bonly\s+(?:show|include|get)",
            r"\bexclude\s+",
            r"\b(?:greater|less)\s+than\b",
            r"\bbetween\s+.*\s+and\b",
        ],
    ),
    (
        IntentType::TransformData,
        &[
            r"\btransform\s+",
            r"\bconvert\s+",
            r"\bcalculate\s+",
            r"\bderive\s+",
            r"\badd\s+(?:a\s+)?(?:new\s+)?column",
            r"\bcreate\s+(?:a\s+)?(?:new\s+)?field",
        ],
    ),
    (
        IntentType::ExploreData,
        &[
            r"\bshow\s+(?:me\s+)?",
            r"\blist\s+",
            r"\bexplore\s+",
            r"\bdescribe\s+",
            r"\bwhat\s+(?:models|tables|columns)\b",
        ],
    ),
];

/// Table reference patterns; capture group 1 is the identifier
pub const TABLE_REFERENCE_PATTERNS: &[&str] = &[
    r"\b(?:from|join|joins|joining|with|and|table|model)\s+([a-zA-Z_][a-zA-Z0-9_]*)",
    r"\b([a-zA-Z_][a-zA-Z0-9_]*)\s+(?:table|model)\b",
    r"`([a-zA-Z_][a-zA-Z0-9_]*)`",
    r"'([a-zA-Z_][a-zA-Z0-9_]*)'",
    r#""([a-zA-Z_][a-zA-Z0-9_]*)""#,
];

/// Join type tables, in priority order; no match means inner
pub const JOIN_TYPE_PATTERNS: &[(JoinType, &[&str])] = &[
    (JoinType::Full, &[r"\bfull\s+(?:outer\s+)?join"]),
    (JoinType::Right, &[r"\bright\s+(?:outer\s+)?join"]),
    (JoinType::Left, &[r"\bleft\s+(?:outer\s+)?join"]),
    (JoinType::Inner, &[r"\binner\s+join", r"\bjoin(?:s|ed|ing)?\b"]),
];

/// Output name patterns, tried in order; capture group 1 is the name
pub const OUTPUT_NAME_PATTERNS: &[&str] = &[
    r"\b(?:call|name)\s+(?:it|this|the\s+model)\s+([a-zA-Z_][a-zA-Z0-9_]*)",
    r"\b(?:as|called)\s+([a-zA-Z_][a-zA-Z0-9_]*)",
    r"\bcreate\s+(?:a\s+)?model\s+([a-zA-Z_][a-zA-Z0-9_]*)",
    r"\bmodel\s+(?:named|called)\s+([a-zA-Z_][a-zA-Z0-9_]*)",
];

/// Materialization tables, first match wins; no match means view
pub const MATERIALIZATION_PATTERNS: &[(Materialization, &[&str])] = &[
    (
        Materialization::Table,
        &[
            r"\b(?:as|into|it)\s+(?:an?\s+)?table\b",
            r"\bmateriali[sz]e[ds]?\s+(?:as\s+)?(?:an?\s+)?table\b",
        ],
    ),
    (
        Materialization::View,
        &[
            r"\b(?:as|into|it)\s+(?:an?\s+)?view\b",
            r"\bmateriali[sz]e[ds]?\s+(?:as\s+)?(?:an?\s+)?view\b",
        ],
    ),
    (Materialization::Incremental, &[r"\bincremental(?:ly)?\b"]),
    (Materialization::Ephemeral, &[r"\bephemeral\b"]),
];

/// Filter fragments; capture group 1 is kept verbatim
pub const FILTER_PATTERNS: &[&str] = &[
    r"\bwhere\s+([^,\n]+)",
    r"\bfilter\s+(?:by\s+)?([^,\n]+)",
    r"\bonly\s+(?:show|include|get)\s+([^,\n]+)",
];

/// Aggregation fragments; capture group 1 is kept verbatim
pub const AGGREGATION_PATTERNS: &[&str] = &[
    r"\b(sum\s+(?:of\s+)?\w+)",
    r"\b(count\s+(?:of\s+)?\w+)",
    r"\b((?:avg|average)\s+(?:of\s+)?\w+)",
    r"\b(min\s+(?:of\s+)?\w+)",
    r"\b(max\s+(?:of\s+)?\w+)",
    r"\b(group\s+by\s+\w+)",
];

/// Transformation fragments; capture group 1 is kept verbatim
pub const TRANSFORMATION_PATTERNS: &[&str] = &[
    r"\b(calculate\s+[^,\n]+)",
    r"\b(convert\s+[^,\n]+)",
    r"\b(add\s+(?:a\s+)?(?:new\s+)?column\s+[^,\n]+)",
    r"\b(create\s+(?:a\s+)?(?:new\s+)?field\s+[^,\n]+)",
];

/// Words that the identifier patterns pick up but never name a table or model
pub const STOPWORDS: &[&str] = &[
    "a", "all", "an", "and", "any", "as", "at", "by", "called", "data", "each", "ephemeral",
    "every", "for", "from", "in", "incremental", "into", "it", "its", "join", "joins", "me",
    "model", "models", "my", "named", "new", "of", "on", "only", "or", "our", "select", "show",
    "some", "table", "tables", "that", "the", "their", "them", "these", "this", "those", "to",
    "using", "view", "where", "which", "with", "your",
];

pub fn is_stopword(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    STOPWORDS.binary_search(&lower.as_str()).is_ok()
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Compile a list of patterns, preserving order
pub fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// A compiled pattern table
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    pub fn new(patterns: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: compile_all(patterns)?,
        })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of patterns with at least one match in `text`
    pub fn count_matches(&self, text: &str) -> usize {
        self.patterns.iter().filter(|re| re.is_match(text)).count()
    }

    pub fn any_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    /// Fraction of patterns that match, in [0, 1]
    pub fn score(&self, text: &str) -> f64 {
        if self.patterns.is_empty() {
            return 0.0;
        }
        self.count_matches(text) as f64 / self.patterns.len() as f64
    }
}

/// Compile a keyed table, preserving row order
pub fn compile_table<K: Copy>(table: &[(K, &[&str])]) -> Result<Vec<(K, PatternSet)>, regex::Error> {
    table
        .iter()
        .map(|(key, patterns)| Ok((*key, PatternSet::new(patterns)?)))
        .collect()
}

/// Trimmed, non-empty group-1 captures of every pattern, pattern by pattern
pub fn captures(patterns: &[Regex], text: &str) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
