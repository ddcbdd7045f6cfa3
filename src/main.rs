//! codebase-analysis - Ask questions about a codebase
//!
//! Indexes functions, classes and methods with LLM summaries and embeddings,
//! then answers questions with numbered citations back into the source.

use anyhow::Result;
use codebase_analysis::cli::{
    ask, breakdown, index, init, print_answer_text, print_breakdown_text, print_config_text,
    print_index_text, print_json, print_status_text, show_config, status, Cli, Commands,
    OutputFormat,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging; RUST_LOG wins over the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.as_path();

    // Execute command
    match cli.command {
        Commands::Init(args) => {
            init(config_path, args.force)?;
        }

        Commands::Index(args) => {
            let stats = index(config_path, &args.path, args.repo.as_deref(), args.fresh).await?;

            match cli.format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Text => print_index_text(&stats),
            }
        }

        Commands::Ask(args) => {
            let answer = ask(config_path, &args.question).await?;

            match cli.format {
                OutputFormat::Json => print_json(&answer)?,
                OutputFormat::Text => print_answer_text(&answer),
            }
        }

        Commands::Breakdown(args) => {
            let breakdown = breakdown(&args.file)?;

            match cli.format {
                OutputFormat::Json => print_json(&breakdown)?,
                OutputFormat::Text => print_breakdown_text(&breakdown),
            }
        }

        Commands::Status => {
            let stats = status(config_path)?;

            match cli.format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Text => print_status_text(&stats),
            }
        }

        Commands::Config(args) => {
            let config = show_config(config_path, args.reset)?;

            match cli.format {
                OutputFormat::Json => print_json(&config)?,
                OutputFormat::Text => print_config_text(&config),
            }
        }
    }

    Ok(())
}
