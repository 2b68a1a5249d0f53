
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tracing::{debug, info, warn};

use super::{
    ChunkPayload, IndexedRecord, SearchResult, VectorIndex, check_query_dimensions,
    check_record_dimensions,
};
use crate::config::IndexConfig;
use crate::{RagError, Result};

/// A collection stored as an embedded LanceDB table on local disk
pub struct LanceIndex {
    connection: Connection,
    table_name: String,
    vector_size: usize,
}

impl LanceIndex {
    /// Open (or create) the database directory; the table is created lazily
    #[inline]
    pub async fn open(db_path: &Path, config: &IndexConfig) -> Result<Self> {
        debug!("Opening LanceDB at {}", db_path.display());

        std::fs::create_dir_all(db_path).map_err(|e| {
            RagError::BackendUnavailable(format!(
                "Failed to create vector database directory {}: {}",
                db_path.display(),
                e
            ))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| storage_error("Failed to connect to LanceDB", &e))?;

        Ok(Self {
            connection,
            table_name: config.collection.clone(),
            vector_size: config.vector_size,
        })
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| storage_error("Failed to list tables", &e))?;
        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| match e {
                lancedb::Error::TableNotFound { .. } => RagError::NotFound(format!(
                    "Collection '{}' does not exist",
                    self.table_name
                )),
                other => storage_error("Failed to open table", &other),
            })
    }

    async fn create_table(&self) -> Result<()> {
        self.connection
            .create_empty_table(&self.table_name, self.schema()?)
            .execute()
            .await
            .map_err(|e| storage_error("Failed to create table", &e))?;

        info!(
            "Created LanceDB table '{}' with {} dimensions",
            self.table_name, self.vector_size
        );
        Ok(())
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        if self.table_exists().await? {
            info!("Dropping LanceDB table '{}'", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| storage_error("Failed to drop table", &e))?;
        }
        Ok(())
    }

    /// Dimensionality of the vector column in an existing table
    async fn existing_vector_size(&self) -> Result<Option<usize>> {
        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| storage_error("Failed to read table schema", &e))?;

        Ok(schema.fields().iter().find_map(|field| {
            match (field.name().as_str(), field.data_type()) {
                ("vector", DataType::FixedSizeList(_, size)) => usize::try_from(*size).ok(),
                _ => None,
            }
        }))
    }

    /// Arrow list width for the vector column
    fn list_size(&self) -> Result<i32> {
        i32::try_from(self.vector_size).map_err(|_| {
            RagError::InvalidInput(format!(
                "Vector size {} is too large for a LanceDB vector column",
                self.vector_size
            ))
        })
    }

    fn schema(&self) -> Result<Arc<Schema>> {
        Ok(Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.list_size()?,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("chunk_id", DataType::UInt32, false),
            Field::new("chunk_size", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ])))
    }

    fn record_batch(&self, records: &[IndexedRecord]) -> Result<RecordBatch> {
        let len = records.len();
        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.vector_size);
        let mut texts = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut chunk_ids = Vec::with_capacity(len);
        let mut chunk_sizes = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            texts.push(record.payload.text.as_str());
            sources.push(record.payload.source.as_str());
            chunk_ids.push(record.payload.chunk_id);
            chunk_sizes.push(record.payload.chunk_size);
            created_ats.push(record.payload.created_at.as_str());
        }

        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.list_size()?,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| RagError::InvalidInput(format!("Failed to build vector column: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(sources)),
            Arc::new(UInt32Array::from(chunk_ids)),
            Arc::new(UInt32Array::from(chunk_sizes)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.schema()?, arrays)
            .map_err(|e| RagError::InvalidInput(format!("Failed to build record batch: {}", e)))
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn ensure_collection(&self) -> Result<()> {
        if !self.table_exists().await? {
            return self.create_table().await;
        }

        match self.existing_vector_size().await? {
            Some(size) if size == self.vector_size => {
                debug!("LanceDB table '{}' already exists", self.table_name);
                Ok(())
            }
            Some(size) => Err(RagError::InvalidInput(format!(
                "Collection '{}' stores {}-dimensional vectors but {} are configured",
                self.table_name, size, self.vector_size
            ))),
            None => Err(RagError::InvalidInput(format!(
                "Collection '{}' has no vector column",
                self.table_name
            ))),
        }
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No records to upsert");
            return Ok(());
        }
        check_record_dimensions(self.vector_size, records)?;

        let table = self.open_table().await?;

        let id_list = records
            .iter()
            .map(|r| format!("'{}'", r.id.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        table
            .delete(&format!("id IN ({})", id_list))
            .await
            .map_err(|e| storage_error("Failed to replace existing records", &e))?;

        let batch = self.record_batch(records)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| storage_error("Failed to insert records", &e))?;

        info!(
            "Upserted {} records into LanceDB table '{}'",
            records.len(),
            self.table_name
        );
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        check_query_dimensions(self.vector_size, query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let table = self.open_table().await?;
        let mut stream = table
            .vector_search(query)
            .map_err(|e| RagError::InvalidInput(format!("Failed to build vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| storage_error("Failed to execute search", &e))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| storage_error("Failed to read search results", &e))?
        {
            results.extend(parse_search_batch(&batch)?);
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        debug!("LanceDB returned {} results", results.len());
        Ok(results)
    }

    async fn clear(&self) -> Result<()> {
        self.drop_table_if_exists().await?;
        self.create_table().await?;
        info!("Cleared LanceDB table '{}'", self.table_name);
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| storage_error("Failed to count rows", &e))?;
        Ok(count as u64)
    }

    async fn is_ready(&self) -> bool {
        match self.table_exists().await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("LanceDB readiness check failed: {}", e);
                false
            }
        }
    }

    fn collection(&self) -> &str {
        &self.table_name
    }

    fn vector_size(&self) -> usize {
        self.vector_size
    }
}

fn storage_error(context: &str, error: &lancedb::Error) -> RagError {
    RagError::BackendUnavailable(format!("{}: {}", context, error))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::InvalidInput(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::InvalidInput(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::InvalidInput(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::InvalidInput(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let sources = string_column(batch, "source")?;
    let chunk_ids = u32_column(batch, "chunk_id")?;
    let chunk_sizes = u32_column(batch, "chunk_size")?;
    let created_ats = string_column(batch, "created_at")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    Ok((0..batch.num_rows())
        .map(|row| {
            let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });
            SearchResult {
                id: ids.value(row).to_string(),
                // cosine distance is 1 - similarity
                score: 1.0 - distance,
                payload: ChunkPayload {
                    text: texts.value(row).to_string(),
                    source: sources.value(row).to_string(),
                    chunk_id: chunk_ids.value(row),
                    chunk_size: chunk_sizes.value(row),
                    created_at: created_ats.value(row).to_string(),
                },
            }
        })
        .collect())
}
