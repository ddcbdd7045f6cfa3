//! LLM-backed enrichment and question answering
//!
//! This module handles:
//! - Summarizing functions, classes and methods
//! - Embedding summaries for semantic search
//! - Answering a question from an assembled context

mod client;
mod embedding;
mod prompts;

pub use client::{
    base_url, is_ollama, ChatMessage, ChatRequest, CompletionProvider, LlmClient, LlmConfig,
    LlmResponse, MockLlmClient,
};
pub use embedding::{
    provider_for, EmbeddingProvider, LocalEmbedding, MockEmbedding, OpenAIEmbedding,
};
pub use prompts::{AnswerPrompt, SummaryPrompt};

use crate::extract::{FileBreakdown, SourceUnit, UnitKind};
use anyhow::{Context, Result};
use std::time::Duration;

/// Default number of attempts per summary or embedding
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default delay unit between attempts; attempt `n` waits `n` units
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Fills in summaries and embeddings for extracted units
///
/// Every call builds its own request, so one enricher can serve many units
/// without carrying conversation state between them. Failures never abort
/// indexing: after the last attempt a summary falls back to an empty string
/// and an embedding to the zero vector.
pub struct Enricher {
    completion: Box<dyn CompletionProvider>,
    embedding: Box<dyn EmbeddingProvider>,
    max_attempts: usize,
    backoff: Duration,
}

impl Enricher {
    /// Create an enricher with the default retry policy
    pub fn new(
        completion: Box<dyn CompletionProvider>,
        embedding: Box<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            completion,
            embedding,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Set the number of attempts (at least one is always made)
    pub fn with_retries(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the delay unit between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Dimension of the vectors this enricher produces
    pub fn dimension(&self) -> usize {
        self.embedding.dimension()
    }

    /// Summarize `text` as a unit of kind `role`
    pub async fn summarize(&self, text: &str, role: UnitKind) -> String {
        let request = SummaryPrompt::request(text, role);

        for attempt in 1..=self.max_attempts {
            match self.completion.complete(&request).await {
                Ok(response) => {
                    log_usage("summary", &response);
                    return response.content.trim().to_string();
                }
                Err(e) => {
                    tracing::warn!(
                        "Summary attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        role,
                        e
                    );
                    self.pause(attempt).await;
                }
            }
        }

        tracing::warn!("Giving up on {} summary, storing an empty one", role);
        String::new()
    }

    /// Embed `text`, falling back to the zero vector
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let dimension = self.dimension();

        for attempt in 1..=self.max_attempts {
            match self.embedding.embed(text).await {
                Ok(vector) if vector.len() == dimension => return vector,
                Ok(vector) => {
                    tracing::warn!(
                        "Embedding attempt {}/{} returned {} values, expected {}",
                        attempt,
                        self.max_attempts,
                        vector.len(),
                        dimension
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Embedding attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                }
            }
            self.pause(attempt).await;
        }

        tracing::warn!("Giving up on embedding, storing a zero vector");
        vec![0.0; dimension]
    }

    /// Fill in summary and embedding for a unit and all of its methods
    pub async fn enrich_unit(&self, unit: &mut SourceUnit) {
        self.enrich_one(unit).await;
        for method in unit.methods.iter_mut() {
            self.enrich_one(method).await;
        }
    }

    /// Enrich every unit of a file
    pub async fn enrich_breakdown(&self, breakdown: &mut FileBreakdown) {
        for function in breakdown.functions.iter_mut() {
            self.enrich_unit(function).await;
        }
        for class in breakdown.classes.iter_mut() {
            self.enrich_unit(class).await;
        }
    }

    /// Answer `question` from an assembled context
    pub async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let request = AnswerPrompt::request(question, context);
        let response = self
            .completion
            .complete(&request)
            .await
            .context("Failed to generate an answer")?;
        log_usage("answer", &response);

        Ok(response.content.trim().to_string())
    }

    async fn enrich_one(&self, unit: &mut SourceUnit) {
        let summary = self.summarize(&unit.text, unit.kind).await;
        unit.summary = Some(summary);
        let embedding = self.embed(unit.embedding_text()).await;
        unit.embedding = Some(embedding);
    }

    async fn pause(&self, attempt: usize) {
        if attempt < self.max_attempts && !self.backoff.is_zero() {
            tokio::time::sleep(self.backoff * attempt as u32).await;
        }
    }
}

fn log_usage(purpose: &str, response: &LlmResponse) {
    if let Some(tokens) = response.tokens_used {
        tracing::debug!("{} used {} token(s)", purpose, tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fails a fixed number of times before answering
    struct FlakyCompletion {
        failures: usize,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl CompletionProvider for FlakyCompletion {
        async fn complete(&self, _request: &ChatRequest) -> Result<LlmResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                anyhow::bail!("endpoint unavailable");
            }
            Ok(LlmResponse {
                content: "  Adds two numbers.\n".to_string(),
                tokens_used: None,
            })
        }
    }

    /// Always returns a vector of the wrong size
    struct ShortEmbedding {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortEmbedding {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    fn flaky(failures: usize) -> (Box<FlakyCompletion>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Box::new(FlakyCompletion {
            failures,
            calls: Arc::clone(&calls),
        });
        (provider, calls)
    }

    #[tokio::test]
    async fn test_summary_recovers_after_failures() {
        let (completion, calls) = flaky(2);
        let enricher = Enricher::new(completion, Box::new(MockEmbedding::new(8)))
            .with_backoff(Duration::ZERO);

        let summary = enricher.summarize("def add(a, b):", UnitKind::Function).await;

        assert_eq!(summary, "Adds two numbers.");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_summary_falls_back_to_empty() {
        let (completion, calls) = flaky(usize::MAX);
        let enricher = Enricher::new(completion, Box::new(MockEmbedding::new(8)))
            .with_retries(2)
            .with_backoff(Duration::ZERO);

        let summary = enricher.summarize("def add(a, b):", UnitKind::Function).await;

        assert!(summary.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wrong_dimension_falls_back_to_zero_vector() {
        let calls = Arc::new(AtomicUsize::new(0));
        let embedding = Box::new(ShortEmbedding {
            calls: Arc::clone(&calls),
        });
        let enricher = Enricher::new(Box::new(MockLlmClient::new()), embedding)
            .with_retries(3)
            .with_backoff(Duration::ZERO);

        let vector = enricher.embed("anything").await;

        assert_eq!(vector, vec![0.0; 4]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_enrich_unit_covers_methods() {
        let mut methods = crate::extract::UnitMap::default();
        methods.insert(SourceUnit::new(
            "area",
            UnitKind::Method,
            "    def area(self):\n        return 0",
        ));
        let mut class = SourceUnit::new("Shape", UnitKind::Class, "class Shape:\n    pass")
            .with_methods(methods);

        let enricher = Enricher::new(
            Box::new(MockLlmClient::new().with_default_response("A shape.")),
            Box::new(MockEmbedding::new(16)),
        );
        enricher.enrich_unit(&mut class).await;

        assert_eq!(class.summary.as_deref(), Some("A shape."));
        assert_eq!(class.embedding.as_ref().map(Vec::len), Some(16));

        let method = class.methods.get("area").unwrap();
        assert_eq!(method.summary.as_deref(), Some("A shape."));
        assert!(method.embedding.is_some());
    }

    #[tokio::test]
    async fn test_each_summary_is_an_independent_request() {
        let client = Arc::new(MockLlmClient::new());
        let enricher = Enricher::new(
            Box::new(SharedMock(Arc::clone(&client))),
            Box::new(MockEmbedding::new(4)),
        );

        enricher.summarize("def a():", UnitKind::Function).await;
        enricher.summarize("def b():", UnitKind::Function).await;

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 2);
        assert!(!requests[1].contains("def a():"));
    }

    struct SharedMock(Arc<MockLlmClient>);

    #[async_trait::async_trait]
    impl CompletionProvider for SharedMock {
        async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse> {
            self.0.complete(request).await
        }
    }
}
