
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    ChunkPayload, IndexedRecord, SearchResult, VectorIndex, check_query_dimensions,
    check_record_dimensions,
};
use crate::config::IndexConfig;
use crate::http::HttpClient;
use crate::{RagError, Result};

/// A collection on a Qdrant server, reached over its REST API
#[derive(Debug, Clone)]
pub struct QdrantIndex {
    base_url: Url,
    collection: String,
    vector_size: usize,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Debug, Serialize)]
struct UpsertPoints<'a> {
    points: Vec<PointStruct<'a>>,
}

#[derive(Debug, Serialize)]
struct PointStruct<'a> {
    id: &'a str,
    vector: &'a [f32],
    payload: &'a ChunkPayload,
}

#[derive(Debug, Serialize)]
struct QueryPoints<'a> {
    query: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    payload: Option<ChunkPayload>,
}

#[derive(Debug, Serialize)]
struct CountPoints {
    exact: bool,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

impl QdrantIndex {
    #[inline]
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let base_url = config
            .url()
            .map_err(|e| RagError::Config(format!("Invalid Qdrant URL: {}", e)))?;

        Ok(Self {
            base_url,
            collection: config.collection.clone(),
            vector_size: config.vector_size,
            http: HttpClient::new("Qdrant").with_timeout(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http = self.http.with_retry_attempts(attempts);
        self
    }

    /// Names of every collection on the server
    #[inline]
    pub fn list_collections(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["collections"])?;
        let response: QdrantResponse<CollectionList> = self.http.get_json(&url)?;
        Ok(response
            .result
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    fn collection_exists(&self) -> Result<bool> {
        Ok(self.list_collections()?.contains(&self.collection))
    }

    fn create_collection(&self) -> Result<()> {
        let url = self.endpoint(&["collections", &self.collection])?;
        let body = CreateCollection {
            vectors: VectorParams {
                size: self.vector_size,
                distance: "Cosine",
            },
        };
        let _: QdrantResponse<Value> = self.http.put_json(&url, &body)?;

        info!(
            "Created Qdrant collection '{}' with {} dimensions",
            self.collection, self.vector_size
        );
        Ok(())
    }

    fn delete_collection(&self) -> Result<()> {
        let url = self.endpoint(&["collections", &self.collection])?;
        match self.http.delete(&url) {
            Ok(()) => Ok(()),
            Err(RagError::NotFound(_)) => {
                debug!("Collection '{}' was already absent", self.collection);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RagError::Config(format!("Qdrant URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists()? {
            debug!("Qdrant collection '{}' already exists", self.collection);
            return Ok(());
        }
        self.create_collection()
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No records to upsert");
            return Ok(());
        }
        check_record_dimensions(self.vector_size, records)?;

        let mut url = self.endpoint(&["collections", &self.collection, "points"])?;
        url.set_query(Some("wait=true"));

        let body = UpsertPoints {
            points: records
                .iter()
                .map(|r| PointStruct {
                    id: &r.id,
                    vector: &r.vector,
                    payload: &r.payload,
                })
                .collect(),
        };
        let _: QdrantResponse<Value> = self.http.put_json(&url, &body)?;

        info!(
            "Upserted {} points into Qdrant collection '{}'",
            records.len(),
            self.collection
        );
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        check_query_dimensions(self.vector_size, query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&["collections", &self.collection, "points", "query"])?;
        let body = QueryPoints {
            query,
            limit,
            with_payload: true,
        };
        let response: QdrantResponse<QueryResult> = self.http.post_json(&url, &body)?;

        let mut results: Vec<SearchResult> = response
            .result
            .points
            .into_iter()
            .filter_map(|point| {
                let id = match point.id {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                let Some(payload) = point.payload else {
                    warn!("Point {} has no payload, skipping", id);
                    return None;
                };
                Some(SearchResult {
                    id,
                    score: point.score,
                    payload,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        debug!("Qdrant returned {} results", results.len());
        Ok(results)
    }

    async fn clear(&self) -> Result<()> {
        self.delete_collection()?;
        self.create_collection()?;
        info!("Cleared Qdrant collection '{}'", self.collection);
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let url = self.endpoint(&["collections", &self.collection, "points", "count"])?;
        let response: QdrantResponse<CountResult> =
            self.http.post_json(&url, &CountPoints { exact: true })?;
        Ok(response.result.count)
    }

    async fn is_ready(&self) -> bool {
        match self.collection_exists() {
            Ok(exists) => exists,
            Err(e) => {
                debug!("Qdrant readiness check failed: {}", e);
                false
            }
        }
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn vector_size(&self) -> usize {
        self.vector_size
    }
}
