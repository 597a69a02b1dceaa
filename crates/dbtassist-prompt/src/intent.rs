//! Intent classification

use serde::{Deserialize, Serialize};

use crate::patterns::{PatternSet, INTENT_PATTERNS};

/// What the user is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    CreateModel,
    JoinTables,
    AggregateData,
    FilterData,
    TransformData,
    ExploreData,
    Unknown,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateModel => "create_model",
            Self::JoinTables => "join_tables",
            Self::AggregateData => "aggregate_data",
            Self::FilterData => "filter_data",
            Self::TransformData => "transform_data",
            Self::ExploreData => "explore_data",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores prompts against the intent pattern tables
///
/// An intent's score is the fraction of its patterns that match. The highest
/// score wins; ties go to the intent listed first in [`INTENT_PATTERNS`].
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    tables: Vec<(IntentType, PatternSet)>,
}

impl IntentClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        let tables = INTENT_PATTERNS
            .iter()
            .map(|(intent, patterns)| Ok((*intent, PatternSet::new(patterns)?)))
            .collect::<Result<_, regex::Error>>()?;
        Ok(Self { tables })
    }

    /// Per-intent scores in table order
    pub fn scores(&self, prompt: &str) -> Vec<(IntentType, f64)> {
        let prompt = prompt.to_lowercase();
        self.tables
            .iter()
            .map(|(intent, set)| (*intent, set.score(&prompt)))
            .collect()
    }

    /// Best intent and its confidence; `(Unknown, 0.0)` when nothing matches
    pub fn classify(&self, prompt: &str) -> (IntentType, f64) {
        let mut best = (IntentType::Unknown, 0.0);
        for (intent, score) in self.scores(prompt) {
            if score > best.1 {
                best = (intent, score);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(prompt: &str) -> (IntentType, f64) {
        IntentClassifier::new().unwrap().classify(prompt)
    }

    #[test]
    fn join_beats_create_when_prompt_joins() {
        let (intent, confidence) = classify("create a model that joins customers with orders");
        assert_eq!(intent, IntentType::JoinTables);
        assert!((confidence - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_join_types() {
        assert_eq!(classify("left join payments to orders").0, IntentType::JoinTables);
        assert_eq!(classify("merge customers and accounts").0, IntentType::JoinTables);
    }

    #[test]
    fn aggregate_prompts() {
        let (intent, _) = classify("total revenue, sum of amount group by customer_id");
        assert_eq!(intent, IntentType::AggregateData);
    }

    #[test]
    fn filter_prompts() {
        let (intent, confidence) = classify("filter orders where amount is greater than 100");
        assert_eq!(intent, IntentType::FilterData);
        assert!((confidence - 3.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn transform_prompts() {
        assert_eq!(classify("convert amount to dollars").0, IntentType::TransformData);
    }

    #[test]
    fn create_only_prompt() {
        let (intent, confidence) = classify("Build a new model for finance");
        assert_eq!(intent, IntentType::CreateModel);
        assert!((confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn explore_prompts() {
        assert_eq!(classify("show me what models exist").0, IntentType::ExploreData);
    }

    #[test]
    fn nothing_matches_is_unknown() {
        assert_eq!(classify("hello there"), (IntentType::Unknown, 0.0));
        assert_eq!(classify(""), (IntentType::Unknown, 0.0));
    }

    #[test]
    fn ties_go_to_earlier_table() {
        // create and aggregate both score 1/5
        let (intent, _) = classify("create a model with a count");
        assert_eq!(intent, IntentType::CreateModel);
    }

    #[test]
    fn classification_is_deterministic_and_bounded() {
        let classifier = IntentClassifier::new().unwrap();
        let prompts = [
            "join a with b and left join c",
            "where where where",
            "calculate the total sum of revenue",
        ];
        for prompt in prompts {
            let first = classifier.classify(prompt);
            assert_eq!(first, classifier.classify(prompt));
            assert!((0.0..=1.0).contains(&first.1));
        }
    }
}
