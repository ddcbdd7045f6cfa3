//! Embedding generation for semantic search
//!
//! Supports local embedding via Ollama and OpenAI-compatible endpoints
//! (text-embeddings-inference, vLLM, OpenAI itself).

use super::client::{base_url, is_ollama};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Trait for embedding providers
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned"))
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Build the provider matching an endpoint
pub fn provider_for(
    endpoint: &str,
    model: &str,
    api_key: Option<&str>,
    dimension: usize,
) -> Box<dyn EmbeddingProvider> {
    if is_ollama(endpoint) {
        Box::new(LocalEmbedding::new(endpoint, model).with_dimension(dimension))
    } else {
        Box::new(OpenAIEmbedding::new(endpoint, model, api_key).with_dimension(dimension))
    }
}

/// Local embedding provider using Ollama
pub struct LocalEmbedding {
    /// API endpoint URL
    endpoint: String,
    /// Model name
    model: String,
    /// HTTP client
    client: reqwest::Client,
    /// Embedding dimension
    dimension: usize,
}

impl LocalEmbedding {
    /// Create a new local embedding provider
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: base_url(endpoint).to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            dimension: 384, // Default for many sentence-transformer models
        }
    }

    /// Set the embedding dimension
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    /// Embed a single text using Ollama API
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.endpoint);

        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding request failed: {} - {}", status, body);
        }

        let result: OllamaEmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        Ok(result.embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for text in texts {
            let embedding = self.embed_single(text).await?;
            embeddings.push(embedding);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Ollama embedding request
#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

/// Ollama embedding response
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embedding provider
pub struct OpenAIEmbedding {
    /// API endpoint URL
    endpoint: String,
    /// Model name
    model: String,
    /// API key
    api_key: Option<String>,
    /// HTTP client
    client: reqwest::Client,
    /// Embedding dimension
    dimension: usize,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI-compatible embedding provider
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: base_url(endpoint).to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            client: reqwest::Client::new(),
            dimension: 384,
        }
    }

    /// Set the embedding dimension
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.endpoint);

        let request = OpenAIEmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let mut req_builder = self.client.post(&url).json(&request);

        if let Some(ref key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding request failed: {} - {}", status, body);
        }

        let result: OpenAIEmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        let mut embeddings: Vec<_> = result
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect();

        // Sort by index to maintain order
        embeddings.sort_by_key(|(idx, _)| *idx);

        Ok(embeddings.into_iter().map(|(_, e)| e).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// OpenAI embedding request
#[derive(Debug, Serialize)]
struct OpenAIEmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// OpenAI embedding response
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

/// OpenAI embedding data item
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Mock embedding provider for testing
///
/// Vectors are derived from a hash of the text, so equal texts embed
/// identically and distinct texts almost never do.
pub struct MockEmbedding {
    dimension: usize,
}

impl MockEmbedding {
    /// Create a new mock embedding provider
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let hash = crate::extract::content_hash(text);
                let bytes = hash.as_bytes();

                (0..self.dimension)
                    .map(|i| {
                        let byte = bytes[i % bytes.len()] as f32;
                        (byte / 255.0) * 2.0 - 1.0 // Normalize to [-1, 1]
                    })
                    .collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
