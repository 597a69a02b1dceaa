//! dbtassist command-line interface
//!
//! Works offline against `target/manifest.json`. Generation uses ChatGPT only
//! when an API key is configured.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dbtassist_ai::{ChatGptClient, Generation, GenerationRequest, PatternGenerator, SqlGenerator};
use dbtassist_core::{Config, Materialization, ValidationResult};
use dbtassist_dbt::{Lineage, ManifestReader, ManifestSnapshot, SearchFilters};
use dbtassist_project::ModelFileManager;
use dbtassist_prompt::{PromptAnalysis, PromptProcessor};
use dbtassist_sql::{check_refs, validate_model_file, validate_sql, ValidationProfile};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// dbtassist - natural language to dbt models
#[derive(Parser)]
#[command(name = "dbtassist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dbtassist.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// dbt project root
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what the prompt analysis extracts from a request
    Analyze {
        prompt: String,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a dbt model from a request
    Generate {
        prompt: String,

        /// Model name (default: inferred from the prompt)
        #[arg(short, long)]
        name: Option<String>,

        /// view, table, incremental or ephemeral
        #[arg(short, long)]
        materialization: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Write the model into the project's models directory
        #[arg(short, long)]
        write: bool,

        /// Print the generation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a model file or inline SQL
    Validate {
        /// Model file to validate
        file: Option<PathBuf>,

        /// Inline SQL instead of a file
        #[arg(long, conflicts_with = "file")]
        sql: Option<String>,
    },

    /// Show a model's upstream and downstream models
    Lineage {
        model: String,

        /// Follow dependencies transitively
        #[arg(short, long)]
        all: bool,
    },

    /// Search models by name, description or column
    Search {
        #[arg(default_value = "")]
        query: String,

        #[arg(short, long)]
        materialization: Option<String>,

        #[arg(short, long)]
        layer: Option<String>,

        /// Comma-separated tags; a model needs any one of them
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let mut config = Config::discover(cli.config.as_deref())?;
    config.apply_env_overrides()?;
    if let Some(project) = &cli.project {
        config.project.path = project.clone();
    }

    if cli.verbose {
        eprintln!("{} {}", "Project:".cyan(), config.project.path.display());
        eprintln!("{} {}", "Manifest:".cyan(), config.manifest_path().display());
    }

    match cli.command {
        Commands::Analyze { prompt, json } => analyze_command(&config, &prompt, json),
        Commands::Generate {
            prompt,
            name,
            materialization,
            description,
            write,
            json,
        } => {
            let request = GenerationRequest {
                prompt,
                output_name: name,
                materialization,
                description,
                ..GenerationRequest::default()
            };
            generate_command(&config, request, write, json).await
        }
        Commands::Validate { file, sql } => validate_command(&config, file.as_deref(), sql.as_deref()),
        Commands::Lineage { model, all } => lineage_command(&config, &model, all),
        Commands::Search {
            query,
            materialization,
            layer,
            tags,
            limit,
        } => search_command(&config, &query, materialization, layer, tags, limit),
    }
}

fn load_manifest(config: &Config) -> std::sync::Arc<ManifestSnapshot> {
    let snapshot = ManifestReader::load(config.manifest_path()).snapshot();
    if !snapshot.is_loaded() {
        eprintln!(
            "{} no manifest at {}; run `dbt compile` to populate it",
            "Warning:".yellow().bold(),
            config.manifest_path().display()
        );
    }
    snapshot
}

fn header(title: &str) {
    println!("{}", "=".repeat(60).bright_blue());
    println!("{}", title.bold());
    println!("{}", "=".repeat(60).bright_blue());
}

fn analyze_command(config: &Config, prompt: &str, json: bool) -> Result<()> {
    let snapshot = load_manifest(config);
    let analysis = PromptProcessor::new()?.analyze(prompt, snapshot.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    print_analysis(&analysis);
    Ok(())
}

fn print_analysis(analysis: &PromptAnalysis) {
    header("Prompt Analysis");
    println!(
        "{} {} ({:.0}%)",
        "Intent:".cyan(),
        analysis.intent.as_str().bold(),
        analysis.confidence * 100.0
    );
    println!("{} {}", "Materialization:".cyan(), analysis.materialization);
    if let Some(name) = &analysis.output_name {
        println!("{} {}", "Output name:".cyan(), name);
    }

    if !analysis.table_references.is_empty() {
        println!("\n{}", "Tables:".bold());
        for reference in &analysis.table_references {
            let kind = if reference.is_model {
                "model".green()
            } else {
                "not in manifest".yellow()
            };
            println!("  - {} ({})", reference.name, kind);
        }
    }

    for join in &analysis.join_requirements {
        println!(
            "{} {} {} join {}",
            "Join:".cyan(),
            join.left_table,
            join.join_type,
            join.right_table
        );
    }

    let sections = [
        ("Filters", &analysis.filters),
        ("Aggregations", &analysis.aggregations),
        ("Transformations", &analysis.transformations),
    ];
    for (label, items) in sections {
        if !items.is_empty() {
            println!("{} {}", format!("{}:", label).cyan(), items.join(", "));
        }
    }
}

async fn generate_command(config: &Config, request: GenerationRequest, write: bool, json: bool) -> Result<()> {
    let snapshot = load_manifest(config);
    let processor = PromptProcessor::new()?;

    let pattern = PatternGenerator::new(processor.clone());
    let chatgpt = ChatGptClient::from_config(&config.openai, processor)?;
    let generator: &dyn SqlGenerator = match &chatgpt {
        Some(client) => client,
        None => &pattern,
    };

    let generation = generator.generate(&request, snapshot.all_models()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&generation)?);
    } else {
        print_generation(&generation);
    }

    if write {
        let files = ModelFileManager::new(config.models_dir());
        let written = files.create_model(&generation.result)?;
        if written.success {
            println!("\n{} {}", "✓".green().bold(), written.message);
            if let Some(schema) = &written.schema_path {
                println!("  {} {}", "schema:".cyan(), schema.display());
            }
        } else {
            println!("\n{} {}", "✗".red().bold(), written.message);
            for conflict in &written.conflicts {
                println!("  - {}", conflict.yellow());
            }
            anyhow::bail!("model '{}' was not written", generation.result.model_name);
        }
    }

    Ok(())
}

fn print_generation(generation: &Generation) {
    let result = &generation.result;
    header(&format!("Model: {}", result.model_name));
    println!(
        "{} {:?}  {} {}  {} {:.0}%",
        "Engine:".cyan(),
        generation.engine,
        "Materialization:".cyan(),
        result.materialization,
        "Confidence:".cyan(),
        result.confidence * 100.0
    );
    if let Some(description) = &result.description {
        println!("{} {}", "Description:".cyan(), description);
    }
    println!("\n{}", result.sql);

    for warning in &result.warnings {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }
    for suggestion in &generation.suggestions {
        println!("{} {}", "Suggestion:".cyan(), suggestion);
    }
}

fn validate_command(config: &Config, file: Option<&Path>, sql: Option<&str>) -> Result<()> {
    let snapshot = load_manifest(config);

    let (label, sql, mut result) = match (file, sql) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let result = validate_model_file(path, &content);
            (path.display().to_string(), content, result)
        }
        (None, Some(sql)) => (
            "inline SQL".to_string(),
            sql.to_string(),
            validate_sql(sql, ValidationProfile::Generated),
        ),
        (None, None) => anyhow::bail!("Provide a model file or --sql"),
    };
    for diagnostic in check_refs(&sql, snapshot.as_ref()) {
        result.push(diagnostic);
    }

    header(&format!("Validate: {}", label));
    print_validation(&result);

    if !result.is_valid {
        anyhow::bail!("validation failed with {} error(s)", result.errors.len());
    }
    Ok(())
}

fn print_validation(result: &ValidationResult) {
    for error in &result.errors {
        println!("{} {}", "error:".red().bold(), error);
    }
    for warning in &result.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
    for suggestion in &result.suggestions {
        println!("{} {}", "suggestion:".cyan(), suggestion);
    }

    if result.is_valid {
        println!("\n{}", "✓ SQL looks valid".green().bold());
    } else {
        println!("\n{}", "✗ SQL has errors".red().bold());
    }
}

fn lineage_command(config: &Config, model: &str, all: bool) -> Result<()> {
    let snapshot = load_manifest(config);
    if snapshot.model_by_name(model).is_none() {
        anyhow::bail!("Model '{}' not found", model);
    }

    let manifest = snapshot.manifest();
    let (upstream, downstream) = if all {
        (Lineage::all_upstream(manifest, model), Lineage::all_downstream(manifest, model))
    } else {
        let lineage = Lineage::of(manifest, model);
        (lineage.upstream, lineage.downstream)
    };

    header(&format!("Lineage: {}", model));
    print_names("Upstream", &upstream);
    print_names("Downstream", &downstream);
    Ok(())
}

fn print_names(label: &str, names: &[String]) {
    println!("{} ({})", label.bold(), names.len());
    if names.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for name in names {
        println!("  - {}", name);
    }
}

fn search_command(
    config: &Config,
    query: &str,
    materialization: Option<String>,
    layer: Option<String>,
    tags: Option<String>,
    limit: usize,
) -> Result<()> {
    let filters = SearchFilters {
        materialization: materialization
            .as_deref()
            .map(|m| m.parse::<Materialization>().map_err(anyhow::Error::msg))
            .transpose()?,
        layer,
        tags: tags.as_deref().map(SearchFilters::parse_tags).unwrap_or_default(),
    };

    let snapshot = load_manifest(config);
    let matches = snapshot.search(query.trim(), &filters);

    header(&format!("{} model(s) found", matches.len()));
    for model in matches.iter().take(limit) {
        println!(
            "{} {} {}",
            model.name.bold(),
            format!("[{}]", model.materialization).cyan(),
            model.path.dimmed()
        );
        if let Some(description) = model.description.as_deref().filter(|d| !d.is_empty()) {
            println!("    {}", description);
        }
    }
    if matches.len() > limit {
        println!("{}", format!("... and {} more", matches.len() - limit).dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_options() {
        let cli = Cli::try_parse_from([
            "dbtassist",
            "-p",
            "/tmp/project",
            "generate",
            "join customers and orders",
            "--name",
            "customer_orders",
            "-m",
            "table",
            "--write",
        ])
        .unwrap();

        assert_eq!(cli.project, Some(PathBuf::from("/tmp/project")));
        match cli.command {
            Commands::Generate {
                prompt,
                name,
                materialization,
                write,
                json,
                ..
            } => {
                assert_eq!(prompt, "join customers and orders");
                assert_eq!(name.as_deref(), Some("customer_orders"));
                assert_eq!(materialization.as_deref(), Some("table"));
                assert!(write);
                assert!(!json);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn validate_file_and_sql_conflict() {
        assert!(Cli::try_parse_from(["dbtassist", "validate", "model.sql", "--sql", "select 1"]).is_err());
        assert!(Cli::try_parse_from(["dbtassist", "validate", "--sql", "select 1"]).is_ok());
    }

    #[test]
    fn search_defaults() {
        let cli = Cli::try_parse_from(["dbtassist", "search"]).unwrap();
        match cli.command {
            Commands::Search { query, limit, tags, .. } => {
                assert_eq!(query, "");
                assert_eq!(limit, 20);
                assert!(tags.is_none());
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["dbtassist", "lineage", "orders", "--all", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Lineage { all: true, .. }));
    }
}
