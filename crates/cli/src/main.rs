//! docqa CLI
//!
//! Ingest documents into a vector store and ask questions answered from
//! them.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, StatsCommand};
use docqa_core::{config::AppConfig, logging, AppResult};
use docqa_knowledge::{KnowledgeSettings, RagPipeline};
use std::path::PathBuf;
use tracing::Instrument;

/// docqa - question answering over your own documents
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Retrieval-augmented question answering over ingested documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Generation provider (ollama, openai)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about the ingested documents
    Ask(AskCommand),

    /// Ingest files or directories
    Ingest(IngestCommand),

    /// Show vector store statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Workspace and config file decide which YAML is read, so they apply
    // before loading; the remaining flags override the loaded values.
    let workspace = cli.workspace.clone();
    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match key {
        "DOCQA_WORKSPACE" => workspace.as_ref().map(|p| p.display().to_string()),
        "DOCQA_CONFIG" => config_file.as_ref().map(|p| p.display().to_string()),
        _ => std::env::var(key).ok(),
    })?
    .with_overrides(
        None,
        None,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("docqa starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {:?}", config.model);

    config.validate()?;
    let pipeline = RagPipeline::new(KnowledgeSettings::from_app_config(&config)?);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Ingest(_) => "ingest",
        Commands::Stats(_) => "stats",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&pipeline).await,
            Commands::Ingest(cmd) => cmd.execute(&pipeline).await,
            Commands::Stats(cmd) => cmd.execute(&pipeline).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
