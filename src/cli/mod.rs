//! CLI interface using clap
//!
//! Provides the command-line interface for codebase-analysis

mod commands;

pub use commands::*;

use crate::repo::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// codebase-analysis - Ask questions about a codebase
#[derive(Parser, Debug)]
#[command(name = "codebase-analysis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "CODEBASE_ANALYSIS_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration and create the database
    Init(InitArgs),

    /// Extract, summarize, embed and store a source tree
    Index(IndexArgs),

    /// Ask a question about the indexed code
    Ask(AskArgs),

    /// Show the functions, classes and methods found in a file
    Breakdown(BreakdownArgs),

    /// Show what the database holds
    Status,

    /// Show configuration
    Config(ConfigArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments for init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for index command
#[derive(Parser, Debug)]
pub struct IndexArgs {
    /// Directory to index
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Clone this repository into the checkout directory and index it instead
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Empty the database before indexing
    #[arg(long)]
    pub fresh: bool,
}

/// Arguments for ask command
#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,
}

/// Arguments for breakdown command
#[derive(Parser, Debug)]
pub struct BreakdownArgs {
    /// Source file to break down
    pub file: PathBuf,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Reset to defaults
    #[arg(long)]
    pub reset: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
