
use std::path::Path;

use tracing::{debug, info, warn};

use crate::chunking::{ChunkingConfig, chunk_document};
use crate::config::Config;
use crate::documents::read_document;
use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::generation::{Generator, OllamaGenerator};
use crate::index::{IndexBackend, IndexedRecord, SearchResult, VectorIndex};
use crate::{RagError, Result};

/// Returned instead of a generated answer when retrieval finds nothing
pub const INSUFFICIENT_INFORMATION: &str =
    "I don't have information to answer this question based on the loaded documents.";

/// Outcome of loading one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub source: String,
    pub chunks: usize,
}

/// Health of the collaborating services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    pub llm_reachable: bool,
    pub index_ready: bool,
    pub embedder_reachable: bool,
    pub model_name: String,
    /// Stored records, when the index could be counted
    pub record_count: Option<u64>,
}

/// Chunk, embed and store documents; retrieve and generate answers
pub struct RagPipeline<E = OllamaEmbedder, I = IndexBackend, G = OllamaGenerator> {
    embedder: E,
    index: I,
    generator: G,
    chunking: ChunkingConfig,
}

impl RagPipeline {
    /// Build the gateways described by `config`.
    ///
    /// The collection is created if missing; a failure there is logged rather
    /// than returned so that `status` can still report on the services.
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = OllamaEmbedder::new(&config.embedding)?;
        let index = IndexBackend::connect(config).await?;
        let generator = OllamaGenerator::new(&config.generation)?;

        if let Err(e) = index.ensure_collection().await {
            warn!("Could not prepare collection '{}': {}", index.collection(), e);
        }

        Ok(Self::new(embedder, index, generator, config.chunking))
    }
}

impl<E, I, G> RagPipeline<E, I, G>
where
    E: Embedder,
    I: VectorIndex,
    G: Generator,
{
    #[inline]
    pub fn new(embedder: E, index: I, generator: G, chunking: ChunkingConfig) -> Self {
        Self {
            embedder,
            index,
            generator,
            chunking,
        }
    }

    #[inline]
    pub fn index(&self) -> &I {
        &self.index
    }

    #[inline]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Read a document from disk and index its chunks.
    ///
    /// Nothing is written when reading, chunking or embedding fails. Records
    /// are written in a single upsert.
    #[inline]
    pub async fn load_document(&self, path: &Path) -> Result<LoadSummary> {
        let document = read_document(path)?;
        self.load_text(&document.source, &document.text).await
    }

    /// Index already-extracted text under the given source name
    #[inline]
    pub async fn load_text(&self, source: &str, text: &str) -> Result<LoadSummary> {
        let chunks = chunk_document(source, text, &self.chunking);
        if chunks.is_empty() {
            warn!("Document {} produced no chunks", source);
            return Ok(LoadSummary {
                source: source.to_string(),
                chunks: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::InvalidInput(format!(
                "Embedding service returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<IndexedRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedRecord::new(chunk, vector))
            .collect();
        self.index.upsert(&records).await?;

        info!("Loaded {} chunks from {}", records.len(), source);
        Ok(LoadSummary {
            source: source.to_string(),
            chunks: records.len(),
        })
    }

    /// Nearest chunks to `question`, best first
    #[inline]
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query = self.embedder.embed_one(question).await?;
        let results = self.index.search(&query, top_k).await?;
        debug!("Retrieved {} chunks for question", results.len());
        Ok(results)
    }

    /// Answer `question` from the `top_k` most similar chunks.
    ///
    /// Never fails: retrieval and generation errors are reported in the
    /// returned text, and when nothing is retrieved the model is not called.
    #[inline]
    pub async fn answer(&self, question: &str, top_k: usize) -> String {
        let results = match self.retrieve(question, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed: {}", e);
                return format!("Error searching documents: {}", e);
            }
        };

        if results.is_empty() {
            info!("No relevant chunks found, skipping generation");
            return INSUFFICIENT_INFORMATION.to_string();
        }

        let context: Vec<String> = results.into_iter().map(|r| r.payload.text).collect();
        match self.generator.generate(question, Some(&context)).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Generation failed: {}", e);
                format!("Error generating response: {}", e)
            }
        }
    }

    /// Check every service independently
    #[inline]
    pub async fn status(&self) -> PipelineStatus {
        let llm_reachable = self.generator.is_reachable().await;
        let index_ready = self.index.is_ready().await;
        let embedder_reachable = self.embedder.is_reachable().await;
        let record_count = if index_ready {
            self.index.count().await.ok()
        } else {
            None
        };

        PipelineStatus {
            llm_reachable,
            index_ready,
            embedder_reachable,
            model_name: self.generator.model_name().to_string(),
            record_count,
        }
    }

    /// Remove every stored record
    #[inline]
    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await
    }

    #[inline]
    pub async fn record_count(&self) -> Result<u64> {
        self.index.count().await
    }
}
