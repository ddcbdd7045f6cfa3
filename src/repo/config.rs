//! Configuration for codebase-analysis

use crate::llm::LlmConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "codebase-analysis.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-completion endpoint
    #[serde(default)]
    pub model: ModelConfig,

    /// Embedding endpoint
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Unit store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Question answering
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Source discovery and checkouts
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Text-completion endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API endpoint URL (Ollama when it contains port 11434)
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,

    /// Model name to use
    #[serde(default = "default_model_name")]
    pub model: String,

    /// API key (if required)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens for response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

/// Embedding endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embeddings_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Vector length; pinned in the database on first use
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Attempts per summary or embedding before falling back
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

/// Retrieval and context limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of units placed in the context (K)
    #[serde(default = "default_max_context")]
    pub max_context: usize,

    /// Largest cosine distance a candidate may have
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,

    /// Candidates fetched per unit kind
    #[serde(default = "default_results_per_kind")]
    pub results_per_kind: usize,
}

/// Source discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Extension of files to index
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Where cloned repositories land; stripped from reference paths
    #[serde(default = "default_checkout_dir")]
    pub checkout_dir: PathBuf,

    /// Directory names skipped during traversal
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

fn default_model_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_name() -> String {
    "llama3".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    1024
}

fn default_embeddings_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_embeddings_model() -> String {
    "TEI".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_max_retries() -> usize {
    3
}

fn default_database_path() -> PathBuf {
    PathBuf::from("codebase.db")
}

fn default_max_context() -> usize {
    5
}

fn default_distance_threshold() -> f64 {
    0.5
}

fn default_results_per_kind() -> usize {
    3
}

fn default_file_extension() -> String {
    ".py".to_string()
}

fn default_checkout_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_ignore_dirs() -> Vec<String> {
    vec![
        "target".to_string(),
        "node_modules".to_string(),
        "venv".to_string(),
        ".venv".to_string(),
        "__pycache__".to_string(),
    ]
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            model: default_model_name(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embeddings_endpoint(),
            model: default_embeddings_model(),
            api_key: None,
            dimension: default_dimension(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_context: default_max_context(),
            distance_threshold: default_distance_threshold(),
            results_per_kind: default_results_per_kind(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            file_extension: default_file_extension(),
            checkout_dir: default_checkout_dir(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` or return defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Completion client settings
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            endpoint: self.model.endpoint.clone(),
            model: self.model.model.clone(),
            api_key: self.model.api_key.clone().filter(|key| !key.is_empty()),
            max_tokens: self.model.max_tokens,
            temperature: self.model.temperature,
        }
    }
}
