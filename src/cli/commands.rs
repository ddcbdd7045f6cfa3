//! Command implementations

use crate::extract::FileBreakdown;
use crate::pipeline::{IndexStats, Orchestrator};
use crate::repo::{download_repo, AppConfig};
use crate::retrieval::Answer;
use crate::storage::{Database, DatabaseStats};
use anyhow::{Context, Result};
use std::path::Path;

/// Write a default configuration and create the database
pub fn init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {:?}. Use --force to overwrite it.",
            config_path
        );
    }

    let config = AppConfig::default();
    config.save(config_path)?;

    let _db = Database::open(&config.database.path, config.embeddings.dimension)?;

    println!("✓ Initialized codebase-analysis");
    println!("  Config: {:?}", config_path);
    println!("  Database: {:?}", config.database.path);

    Ok(())
}

/// Index a directory, or a freshly cloned repository
pub async fn index(
    config_path: &Path,
    path: &Path,
    repo_url: Option<&str>,
    fresh: bool,
) -> Result<IndexStats> {
    let config = AppConfig::load_or_default(config_path)?;

    let root = match repo_url {
        Some(url) => download_repo(url, &config.repository.checkout_dir)?,
        None => path.to_path_buf(),
    };
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {:?}", root);
    }

    let orchestrator = Orchestrator::from_config(config)?;
    orchestrator.index(&root, fresh).await
}

/// Answer a question from the indexed code
pub async fn ask(config_path: &Path, question: &str) -> Result<Answer> {
    let config = AppConfig::load_or_default(config_path)?;
    require_database(&config)?;

    let orchestrator = Orchestrator::from_config(config)?;
    orchestrator.ask(question).await
}

/// Extract units from one file without enriching them
pub fn breakdown(file: &Path) -> Result<FileBreakdown> {
    FileBreakdown::from_file(file)
}

/// Row counts of the configured database
pub fn status(config_path: &Path) -> Result<DatabaseStats> {
    let config = AppConfig::load_or_default(config_path)?;
    require_database(&config)?;

    let db = Database::open(&config.database.path, config.embeddings.dimension)?;
    db.get_stats()
}

/// Show (or reset) the configuration
pub fn show_config(config_path: &Path, reset: bool) -> Result<AppConfig> {
    if reset {
        AppConfig::default().save(config_path)?;
        println!("✓ Configuration reset to defaults");
    }
    AppConfig::load_or_default(config_path)
}

fn require_database(config: &AppConfig) -> Result<()> {
    if !config.database.path.exists() {
        anyhow::bail!(
            "Database {:?} not found. Run 'codebase-analysis init' and 'codebase-analysis index' first.",
            config.database.path
        );
    }
    Ok(())
}

/// Print a value in JSON format
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Print a breakdown in text format
pub fn print_breakdown_text(breakdown: &FileBreakdown) {
    println!("File: {}", breakdown.path);

    if breakdown.is_empty() {
        println!("  No functions or classes found.");
        return;
    }

    if !breakdown.functions.is_empty() {
        println!("\nFunctions ({}):", breakdown.functions.len());
        for function in &breakdown.functions {
            println!("  {} ({} lines)", function.name, function.text.lines().count());
        }
    }

    if !breakdown.classes.is_empty() {
        println!("\nClasses ({}):", breakdown.classes.len());
        for class in &breakdown.classes {
            println!("  {} ({} lines)", class.name, class.text.lines().count());
            for method in &class.methods {
                println!("    .{}", method.name);
            }
        }
    }
}

/// Print an answer in text format
pub fn print_answer_text(answer: &Answer) {
    println!("{}", answer.text);
}

/// Print indexing results in text format
pub fn print_index_text(stats: &IndexStats) {
    println!("✓ Indexing complete");
    println!("  Files: {}", stats.files);
    println!("  Functions: {}", stats.functions);
    println!("  Classes: {}", stats.classes);
    println!("  Methods: {}", stats.methods);
}

/// Print database statistics in text format
pub fn print_status_text(stats: &DatabaseStats) {
    println!("codebase-analysis Status");
    println!("========================\n");

    println!("Files: {}", stats.files);
    println!("Functions: {}", stats.functions);
    println!("Classes: {}", stats.classes);
    println!("Methods: {}", stats.methods);

    if stats.files == 0 {
        println!("\nNothing indexed yet. Run 'codebase-analysis index'.");
    }
}

/// Print the configuration in text format
pub fn print_config_text(config: &AppConfig) {
    println!("codebase-analysis Configuration");
    println!("===============================\n");

    println!("Model endpoint: {}", config.model.endpoint);
    println!("Model: {}", config.model.model);
    println!("Temperature: {}", config.model.temperature);
    println!("Max tokens: {}", config.model.max_tokens);

    println!("\nEmbeddings endpoint: {}", config.embeddings.endpoint);
    println!("Embeddings model: {}", config.embeddings.model);
    println!("Dimension: {}", config.embeddings.dimension);
    println!("Max retries: {}", config.embeddings.max_retries);

    println!("\nDatabase: {:?}", config.database.path);

    println!("\nMax context: {}", config.retrieval.max_context);
    println!("Distance threshold: {}", config.retrieval.distance_threshold);
    println!("Results per kind: {}", config.retrieval.results_per_kind);

    println!("\nFile extension: {}", config.repository.file_extension);
    println!("Checkout directory: {:?}", config.repository.checkout_dir);
    println!("Ignored directories:");
    for dir in &config.repository.ignore_dirs {
        println!("  - {}", dir);
    }
}
