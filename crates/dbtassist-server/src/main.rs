//! dbtassist API server
//!
//! Loads `dbtassist.toml` (or defaults), applies environment overrides and
//! serves the HTTP API.

use anyhow::Result;
use clap::Parser;
use dbtassist_core::Config;
use dbtassist_server::{serve, AppState};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// dbtassist - natural language to dbt models, over HTTP
#[derive(Parser)]
#[command(name = "dbtassist-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file (default: dbtassist.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// dbt project root
    #[arg(short, long)]
    project: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Log filter, e.g. `debug` or `dbtassist_runner=debug` (default: RUST_LOG, else info)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = Config::discover(args.config.as_deref())?;
    config.apply_env_overrides()?;
    if let Some(project) = args.project {
        config.project.path = project;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = AppState::from_config(config)?;
    serve(state).await?;

    Ok(())
}
