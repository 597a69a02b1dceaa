//! Chat prompts, rendered with minijinja

use crate::GenerationError;
use dbtassist_core::ManifestModel;
use minijinja::{context, Environment};
use serde::Serialize;

/// Most manifest models listed in the system prompt
pub const MAX_CONTEXT_MODELS: usize = 15;

/// Columns shown per model before summarising the rest
pub const MAX_CONTEXT_COLUMNS: usize = 5;

/// Most focus models listed in the user prompt
pub const MAX_FOCUS_MODELS: usize = 5;

/// Models whose names contain one of these are listed first
const PRIORITY_KEYWORDS: &[&str] = &["customer", "order", "product", "revenue"];

const SYSTEM_TEMPLATE: &str = r#"You are an expert dbt developer. Generate SQL for dbt models following these strict guidelines:

AVAILABLE MODELS IN PROJECT:
{% for model in models %}- {{ model.name }} ({{ model.materialization }}): {{ model.description }}
  Columns: {{ model.columns }}
{% else %}No models available
{% endfor %}
{% raw %}DBT BEST PRACTICES:
1. ALWAYS use {{ ref('model_name') }} for dbt model references
2. Use {{ source('schema', 'table') }} for raw source tables
3. Structure with CTEs (Common Table Expressions) for readability
4. Use lowercase SQL keywords (select, from, where, etc.)
5. Use snake_case for all column names and aliases
6. Include trailing commas in SELECT statements for maintainability
7. Add meaningful comments explaining business logic
8. Use proper indentation (2 spaces)

MATERIALIZATION GUIDELINES:
- view: For lightweight transformations, fast queries
- table: For heavy transformations, frequently queried data
- incremental: For large datasets that grow over time

SQL STRUCTURE TEMPLATE:
{{
  config(materialized='view')
}}

-- Description of what this model does
with source_data as (
  select * from {{ ref('source_model') }}
),

transformed as (
  select
    column_1,
    column_2,
    -- Add calculated fields
    column_1 + column_2 as calculated_field,
    current_timestamp as processed_at
  from source_data
  where condition = 'value'
),

final as (
  select * from transformed
)

select * from final

RESPONSE REQUIREMENTS:
- Return ONLY the SQL code, no explanations or markdown
- Ensure all referenced models exist in the available models list
- If a model doesn't exist, use a similar one or create a reasonable assumption
- Include appropriate model configuration at the top
- Add comments explaining complex logic

COLUMN NAMING:
- Use descriptive names: customer_lifetime_value not clv
- Use standard suffixes: _at for timestamps, _id for identifiers
- Group related columns together in SELECT statements{% endraw %}
"#;

const USER_TEMPLATE: &str = r#"USER REQUEST: {{ prompt }}

ADDITIONAL CONTEXT:
- Preferred materialization: {{ materialization }}
{% if focus_models %}- Focus on these models:
{% for model in focus_models %}  - {{ model }}
{% endfor %}{% endif %}{% if requirements %}- Special requirements: {{ requirements }}
{% endif %}
Generate a complete dbt model SQL file that fulfills this request.
{% raw %}Remember to use {{ ref() }} for model references and follow all dbt best practices.{% endraw %}"#;

/// One model line in the system prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelContext {
    pub name: String,
    pub materialization: String,
    pub description: String,
    pub columns: String,
}

impl ModelContext {
    fn from_model(model: &ManifestModel) -> Self {
        let mut columns = model
            .columns
            .iter()
            .take(MAX_CONTEXT_COLUMNS)
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if model.columns.len() > MAX_CONTEXT_COLUMNS {
            columns.push_str(&format!(" (and {} more)", model.columns.len() - MAX_CONTEXT_COLUMNS));
        }

        Self {
            name: model.name.clone(),
            materialization: model.materialization.to_string(),
            description: model
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "No description".to_string()),
            columns,
        }
    }
}

/// Business-facing models first, then the rest, capped
pub fn select_context_models(models: &[ManifestModel]) -> Vec<ModelContext> {
    let is_priority = |m: &&ManifestModel| {
        let name = m.name.to_lowercase();
        PRIORITY_KEYWORDS.iter().any(|k| name.contains(k))
    };

    models
        .iter()
        .filter(is_priority)
        .chain(models.iter().filter(|m| !is_priority(m)))
        .take(MAX_CONTEXT_MODELS)
        .map(ModelContext::from_model)
        .collect()
}

/// The system and user prompt templates
#[derive(Debug)]
pub struct PromptTemplates {
    env: Environment<'static>,
}

impl PromptTemplates {
    pub fn new() -> Result<Self, GenerationError> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)?;
        env.add_template("user", USER_TEMPLATE)?;
        Ok(Self { env })
    }

    /// System prompt listing the project's models
    pub fn system_prompt(&self, models: &[ManifestModel]) -> Result<String, GenerationError> {
        let models = select_context_models(models);
        Ok(self.env.get_template("system")?.render(context! { models })?)
    }

    /// User prompt carrying the request and its context
    pub fn user_prompt(
        &self,
        prompt: &str,
        materialization: &str,
        focus_models: &[String],
        requirements: Option<&str>,
    ) -> Result<String, GenerationError> {
        let focus_models: Vec<&String> = focus_models.iter().take(MAX_FOCUS_MODELS).collect();
        Ok(self.env.get_template("user")?.render(context! {
            prompt,
            materialization,
            focus_models,
            requirements,
        })?)
    }
}
