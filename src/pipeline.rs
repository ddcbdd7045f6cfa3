//! Indexing and question answering over a source tree
//!
//! Indexing runs extract → enrich → store for every source file. Asking runs
//! embed → search → rank → assemble → complete → reformat.

use crate::extract::breakdown_source;
use crate::llm::{provider_for, Enricher, LlmClient};
use crate::repo::{list_source_files, AppConfig};
use crate::retrieval::{build_context, select_context, Answer, CitationFormatter};
use crate::storage::Database;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Counts from one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files: usize,
    pub functions: usize,
    pub classes: usize,
    pub methods: usize,
}

/// Ties the store, the enricher and the configuration together
pub struct Orchestrator {
    config: AppConfig,
    db: Database,
    enricher: Enricher,
}

impl Orchestrator {
    /// Create an orchestrator from its parts
    pub fn new(config: AppConfig, db: Database, enricher: Enricher) -> Self {
        Self {
            config,
            db,
            enricher,
        }
    }

    /// Build the HTTP clients and open the database described by `config`
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let db = Database::open(&config.database.path, config.embeddings.dimension)?;

        let completion = LlmClient::new(config.llm_config());
        let embeddings = provider_for(
            &config.embeddings.endpoint,
            &config.embeddings.model,
            config
                .embeddings
                .api_key
                .as_deref()
                .filter(|key| !key.is_empty()),
            config.embeddings.dimension,
        );
        let enricher = Enricher::new(Box::new(completion), embeddings)
            .with_retries(config.embeddings.max_retries);

        Ok(Self::new(config, db, enricher))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Index every source file under `root`
    ///
    /// With `fresh`, the database is emptied first. Files that cannot be read
    /// as UTF-8 are skipped.
    pub async fn index(&self, root: &Path, fresh: bool) -> Result<IndexStats> {
        if fresh {
            self.db.clear()?;
        }

        let repository = &self.config.repository;
        let files = list_source_files(root, &repository.file_extension, &repository.ignore_dirs)?;
        tracing::info!("Found {} source file(s) under {:?}", files.len(), root);

        let mut stats = IndexStats::default();
        for file in files {
            let source = match std::fs::read_to_string(&file) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", file, e);
                    continue;
                }
            };

            let mut breakdown = breakdown_source(&file.to_string_lossy(), &source);
            self.enricher.enrich_breakdown(&mut breakdown).await;
            self.db
                .add_breakdown(&breakdown)
                .with_context(|| format!("Failed to store {:?}", file))?;

            let methods: usize = breakdown.classes.iter().map(|c| c.methods.len()).sum();
            tracing::info!(
                "Indexed {}: {} function(s), {} class(es), {} method(s)",
                breakdown.path,
                breakdown.functions.len(),
                breakdown.classes.len(),
                methods
            );

            stats.files += 1;
            stats.functions += breakdown.functions.len();
            stats.classes += breakdown.classes.len();
            stats.methods += methods;
        }

        Ok(stats)
    }

    /// Answer `question` from the indexed units
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let retrieval = &self.config.retrieval;
        let k = retrieval.max_context;

        let vector = self.enricher.embed(question).await;
        let candidates = self.db.similarity_search(
            &vector,
            retrieval.distance_threshold,
            retrieval.results_per_kind,
        )?;
        tracing::debug!("{} candidate(s) for question", candidates.len());

        let selected: Vec<&str> = select_context(&candidates, k)
            .into_iter()
            .map(|c| c.key.as_str())
            .collect();
        let context = build_context(&candidates, k);

        let text = self.enricher.answer(question, &context).await?;

        let formatter =
            CitationFormatter::new(k).with_path_prefix(&self.config.repository.checkout_dir);
        Ok(formatter.reformat(&text, &candidates.retain_keys(&selected), &self.db))
    }
}
