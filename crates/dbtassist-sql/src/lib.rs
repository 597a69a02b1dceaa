//! SQL synthesis and shallow validation
//!
//! [`synthesize`] turns a [`dbtassist_prompt::PromptAnalysis`] into a dbt
//! model skeleton. [`validate_sql`] and [`validate_model_file`] run the
//! heuristic checks that flag obvious problems before dbt ever sees the SQL.

pub mod refs;
pub mod synthesizer;
pub mod validator;

pub use refs::{extract as extract_references, unknown_refs, DbtReference};
pub use synthesizer::{model_name, relation, synthesize, SqlGenerationResult, FALLBACK_MODEL_NAME, PATTERN_CONFIDENCE};
pub use validator::{
    check_refs, style_hints, validate_model_file, validate_sql, ValidationProfile, MISSING_SELECT_MESSAGE,
    RAW_REFERENCE_MESSAGE,
};
