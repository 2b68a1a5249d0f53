// Vector index gateway: stores chunk vectors and answers nearest-neighbour queries

pub mod lance;
pub mod qdrant;


use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::chunking::TextChunk;
use crate::config::{Config, IndexKind};
use crate::{RagError, Result};

pub use lance::LanceIndex;
pub use qdrant::QdrantIndex;

/// Metadata stored alongside every vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub source: String,
    /// Ordinal of the chunk within its document
    pub chunk_id: u32,
    /// Length of `text` in characters
    pub chunk_size: u32,
    pub created_at: String,
}

impl ChunkPayload {
    #[inline]
    pub fn from_chunk(chunk: &TextChunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source: chunk.source.clone(),
            chunk_id: u32::try_from(chunk.index).unwrap_or(u32::MAX),
            chunk_size: u32::try_from(chunk.char_count).unwrap_or(u32::MAX),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// A chunk's vector and payload under a unique identifier
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl IndexedRecord {
    /// Identifiers are random, so re-ingesting a document duplicates its records
    #[inline]
    pub fn new(chunk: &TextChunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            payload: ChunkPayload::from_chunk(chunk),
        }
    }
}

/// A stored chunk ranked against a query vector
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    /// Cosine similarity, higher is closer
    pub score: f32,
    pub payload: ChunkPayload,
}

impl SearchResult {
    #[inline]
    pub fn text(&self) -> &str {
        &self.payload.text
    }
}

/// A collection-oriented vector store.
///
/// An empty search result means no matches; backend failures surface as
/// errors so callers can tell the two apart.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection with cosine distance if it does not exist yet
    async fn ensure_collection(&self) -> Result<()>;

    /// Insert or overwrite records, returning once the write is acknowledged
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()>;

    /// At most `limit` results, best match first
    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Drop and recreate the collection
    async fn clear(&self) -> Result<()>;

    async fn count(&self) -> Result<u64>;

    /// Whether the backend answers and the collection exists
    async fn is_ready(&self) -> bool;

    fn collection(&self) -> &str;

    fn vector_size(&self) -> usize;
}

/// Reject records whose vectors do not match the collection dimensionality
#[inline]
pub fn check_record_dimensions(expected: usize, records: &[IndexedRecord]) -> Result<()> {
    match records.iter().find(|r| r.vector.len() != expected) {
        Some(record) => Err(RagError::InvalidInput(format!(
            "Record {} has {} dimensions, collection expects {}",
            record.id,
            record.vector.len(),
            expected
        ))),
        None => Ok(()),
    }
}

#[inline]
pub fn check_query_dimensions(expected: usize, query: &[f32]) -> Result<()> {
    if query.len() == expected {
        Ok(())
    } else {
        Err(RagError::InvalidInput(format!(
            "Query vector has {} dimensions, collection expects {}",
            query.len(),
            expected
        )))
    }
}

/// The index implementation selected by configuration
pub enum IndexBackend {
    Qdrant(QdrantIndex),
    Lance(LanceIndex),
}

impl IndexBackend {
    /// Connect to the configured backend without touching the collection
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self> {
        info!("Using {} vector index", config.index.backend.as_str());
        match config.index.backend {
            IndexKind::Qdrant => Ok(Self::Qdrant(QdrantIndex::new(&config.index)?)),
            IndexKind::Lancedb => Ok(Self::Lance(
                LanceIndex::open(&config.vector_database_path(), &config.index).await?,
            )),
        }
    }

    fn inner(&self) -> &dyn VectorIndex {
        match self {
            Self::Qdrant(index) => index,
            Self::Lance(index) => index,
        }
    }
}

#[async_trait]
impl VectorIndex for IndexBackend {
    async fn ensure_collection(&self) -> Result<()> {
        self.inner().ensure_collection().await
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()> {
        self.inner().upsert(records).await
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.inner().search(query, limit).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner().clear().await
    }

    async fn count(&self) -> Result<u64> {
        self.inner().count().await
    }

    async fn is_ready(&self) -> bool {
        self.inner().is_ready().await
    }

    fn collection(&self) -> &str {
        self.inner().collection()
    }

    fn vector_size(&self) -> usize {
        self.inner().vector_size()
    }
}
