//! Railguard
//!
//! Interactive chat agent with layered guardrails.
//!
//! Every user message passes an input check, is answered by the configured
//! generation provider (which may call registered actions), then passes an
//! output check and a fact check before it is shown.

use anyhow::{Context, Result};
use clap::Parser;
use railguard_pipeline::{
    build_provider, register_builtin_actions, ActionRegistry, Orchestrator, RailsConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

mod driver;

use driver::ChatDriver;

#[derive(Parser, Debug)]
#[command(name = "railguard")]
#[command(about = "Guarded chat agent", long_about = None)]
struct Cli {
    /// Rails configuration directory (or file)
    #[arg(short, long, default_value = "./config")]
    config: PathBuf,

    /// Write the session audit trail to this file as JSON lines
    #[arg(short, long)]
    audit_log: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = RailsConfig::from_path(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let mut registry = ActionRegistry::new();
    register_builtin_actions(&mut registry, &config.rails.fact_checking)?;
    info!(actions = ?registry.names(), "Actions registered");

    let provider = build_provider(&config.model)?;
    let orchestrator = Orchestrator::from_config(&config, Arc::new(registry), provider)?;

    let mut driver = ChatDriver::new(orchestrator);
    driver
        .run_session(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            cli.audit_log.as_deref(),
        )
        .await?;

    Ok(())
}

/// Initialize tracing/logging on stderr
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("railguard=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("railguard=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
