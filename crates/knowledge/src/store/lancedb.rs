//! LanceDB-backed collection store.
//!
//! Rows live in table `rag` with columns `id` (hex SHA-256 of the text),
//! `text` and `embedding`. The table is created on the first add, once the
//! embedding dimension is known.

use crate::store::{batch_dimension, check_dimension, StoreBackend, VectorStore};
use crate::types::SearchHit;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use docqa_core::{AppError, AppResult};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

pub const TABLE_NAME: &str = "rag";
const DISTANCE_COLUMN: &str = "_distance";

pub struct LanceDbStore {
    connection: Connection,
    table: OnceCell<Table>,
    write_lock: Mutex<()>,
}

impl LanceDbStore {
    /// Connect to the database at `path`, opening table `rag` if it exists.
    pub async fn open(path: &Path) -> AppResult<Self> {
        tokio::fs::create_dir_all(path).await.map_err(|e| {
            AppError::Store(format!("Failed to create store directory {:?}: {}", path, e))
        })?;

        let uri = path.to_string_lossy().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to list tables: {}", e)))?;

        let table = OnceCell::new();
        if table_names.iter().any(|name| name == TABLE_NAME) {
            let existing = connection
                .open_table(TABLE_NAME)
                .execute()
                .await
                .map_err(|e| AppError::Store(format!("Failed to open table: {}", e)))?;
            tracing::info!("Opened LanceDB table '{}' at {:?}", TABLE_NAME, path);
            let _ = table.set(existing);
        } else {
            tracing::debug!("LanceDB table '{}' not created yet", TABLE_NAME);
        }

        Ok(Self {
            connection,
            table,
            write_lock: Mutex::new(()),
        })
    }

    fn schema(dim: usize) -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dim as i32,
                ),
                false,
            ),
        ]))
    }

    async fn create_table(&self, dim: usize) -> AppResult<Table> {
        let schema = Self::schema(dim);
        let empty = RecordBatch::new_empty(schema.clone());

        let table = self
            .connection
            .create_table(
                TABLE_NAME,
                RecordBatchIterator::new(vec![Ok(empty)], schema),
            )
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to create table: {}", e)))?;

        tracing::info!("Created LanceDB table '{}' with dimension {}", TABLE_NAME, dim);
        Ok(table)
    }

    async fn table_dimension(table: &Table) -> AppResult<usize> {
        let schema = table
            .schema()
            .await
            .map_err(|e| AppError::Store(format!("Failed to read table schema: {}", e)))?;

        let field = schema
            .field_with_name("embedding")
            .map_err(|e| AppError::Store(format!("Table has no embedding column: {}", e)))?;

        match field.data_type() {
            DataType::FixedSizeList(_, size) if *size > 0 => Ok(*size as usize),
            other => Err(AppError::Store(format!(
                "Unexpected embedding column type: {}",
                other
            ))),
        }
    }

    fn to_batch(dim: usize, texts: &[String], vectors: &[Vec<f32>]) -> AppResult<RecordBatch> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(texts.len());
        let mut kept_texts = Vec::with_capacity(texts.len());
        let mut values = Vec::with_capacity(texts.len() * dim);

        for (text, vector) in texts.iter().zip(vectors) {
            let id = content_id(text);
            if !seen.insert(id.clone()) {
                continue;
            }
            ids.push(id);
            kept_texts.push(text.as_str());
            values.extend_from_slice(vector);
        }

        let embeddings = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dim as i32,
            Arc::new(Float32Array::from(values)),
            None,
        )
        .map_err(|e| AppError::Store(format!("Failed to build embedding column: {}", e)))?;

        RecordBatch::try_new(
            Self::schema(dim),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(kept_texts)),
                Arc::new(embeddings),
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to build record batch: {}", e)))
    }

    fn hits_from_batch(batch: &RecordBatch) -> AppResult<Vec<SearchHit>> {
        let texts = batch
            .column_by_name("text")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| AppError::Store("Invalid text column".to_string()))?;
        let distances = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| AppError::Store("Invalid distance column".to_string()))?;

        Ok((0..batch.num_rows())
            .map(|row| SearchHit::new(texts.value(row), distances.value(row)))
            .collect())
    }
}

#[async_trait::async_trait]
impl VectorStore for LanceDbStore {
    async fn add(&self, texts: &[String], vectors: &[Vec<f32>]) -> AppResult<()> {
        let Some(dim) = batch_dimension(texts, vectors)? else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;

        let table = self
            .table
            .get_or_try_init(|| self.create_table(dim))
            .await?;
        check_dimension(Self::table_dimension(table).await?, dim)?;

        let batch = Self::to_batch(dim, texts, vectors)?;
        let rows = batch.num_rows();
        let schema = batch.schema();

        let mut merge = table.merge_insert(&["id"]);
        merge.when_not_matched_insert_all();
        merge
            .execute(Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema)))
            .await
            .map_err(|e| AppError::Store(format!("Failed to insert chunks: {}", e)))?;

        tracing::debug!("Merged {} chunks into LanceDB table '{}'", rows, TABLE_NAME);
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>> {
        let Some(table) = self.table.get() else {
            return Ok(Vec::new());
        };
        if top_k == 0 || self.len().await? == 0 {
            return Ok(Vec::new());
        }
        check_dimension(Self::table_dimension(table).await?, query.len())?;

        let batches: Vec<RecordBatch> = table
            .query()
            .nearest_to(query.to_vec())
            .map_err(|e| AppError::Store(format!("Failed to create query: {}", e)))?
            .column("embedding")
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Store(format!("Failed to collect results: {}", e)))?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(Self::hits_from_batch(batch)?);
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);

        tracing::debug!("Retrieved {} chunks (requested top-{})", hits.len(), top_k);
        Ok(hits)
    }

    async fn len(&self) -> AppResult<usize> {
        let Some(table) = self.table.get() else {
            return Ok(0);
        };
        table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Store(format!("Failed to count rows: {}", e)))
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Collection
    }
}

/// Row id for a chunk: hex SHA-256 of its text.
pub fn content_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
