// Embedding gateway: turns text into fixed-length vectors via an external model

pub mod ollama;

use async_trait::async_trait;

use crate::{RagError, Result};

pub use ollama::{ModelInfo, OllamaEmbedder};

/// A service that maps text to dense vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in the same order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text, typically a query
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| RagError::InvalidInput("Embedding service returned no vector".to_string()))
    }

    /// The service answers and can serve the configured model
    async fn is_reachable(&self) -> bool;

    fn model_name(&self) -> &str;
}
