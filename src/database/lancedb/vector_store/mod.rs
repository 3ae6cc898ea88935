#[cfg(test)]
mod tests;

use super::{CollectionRecord, Metadata, QueryHit};
use crate::{Error, Result};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path-addressed store holding one LanceDB table per collection
pub struct VectorStore {
    connection: Connection,
}

/// Handle to a single named collection
#[derive(Clone)]
pub struct Collection {
    table: Table,
    name: String,
    dimension: usize,
}

impl VectorStore {
    /// Open (creating if needed) the store rooted at `path`
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        debug!("Opening vector store at path: {:?}", path);

        tokio::fs::create_dir_all(path).await.map_err(|e| {
            Error::VectorStore(format!("Failed to create vector store directory: {}", e))
        })?;

        let uri = path.to_string_lossy().into_owned();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self { connection })
    }

    /// Names of all collections in the store
    #[inline]
    pub async fn collection_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to list tables: {}", e)))
    }

    /// Open the named collection if it exists, with the dimension it was
    /// created with
    #[inline]
    pub async fn open_collection(&self, name: &str) -> Result<Option<Collection>> {
        if !self.collection_names().await?.iter().any(|n| n == name) {
            return Ok(None);
        }

        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to open table {}: {}", name, e)))?;

        let dimension = detect_vector_dimension(&table).await?;
        Ok(Some(Collection {
            table,
            name: name.to_string(),
            dimension,
        }))
    }

    /// Open the named collection, creating an empty one with vectors of
    /// `dimension` floats if it does not exist. An existing collection keeps
    /// the dimension it was created with.
    #[inline]
    pub async fn get_or_create_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<Collection> {
        if let Some(collection) = self.open_collection(name).await? {
            return Ok(collection);
        }

        info!(
            "Creating collection {} with {} dimensions",
            name, dimension
        );
        let table = self
            .connection
            .create_empty_table(name, collection_schema(dimension))
            .execute()
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to create table {}: {}", name, e)))?;

        Ok(Collection {
            table,
            name: name.to_string(),
            dimension,
        })
    }
}

impl Collection {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert records, replacing any rows that share an id
    #[inline]
    pub async fn add(&self, records: &[CollectionRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No records to store");
            return Ok(());
        }

        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dimension) {
            return Err(Error::VectorStore(format!(
                "Record {} has {} dimensions but collection {} expects {}",
                bad.id,
                bad.vector.len(),
                self.name,
                self.dimension
            )));
        }

        debug!("Storing batch of {} records in {}", records.len(), self.name);

        let batch = self.create_record_batch(records)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        let mut merge = self.table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to insert records: {}", e)))?;

        info!("Stored {} records in {}", records.len(), self.name);
        Ok(())
    }

    /// Nearest neighbours of `embedding`, closest first
    #[inline]
    pub async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        if embedding.len() != self.dimension {
            return Err(Error::VectorStore(format!(
                "Query has {} dimensions but collection {} expects {}",
                embedding.len(),
                self.name,
                self.dimension
            )));
        }

        debug!("Searching {} for {} nearest neighbours", self.name, k);

        let results = self
            .table
            .vector_search(embedding)
            .map_err(|e| Error::VectorStore(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to execute search: {}", e)))?;

        let mut hits = parse_result_stream(results).await?;
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    /// Number of rows in the collection
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to count rows: {}", e)))
    }

    fn create_record_batch(&self, records: &[CollectionRecord]) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut documents = Vec::with_capacity(len);
        let mut metadatas = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for record in records {
            ids.push(record.id.as_str());
            documents.push(record.document.as_str());
            flat_values.extend_from_slice(&record.vector);
            let metadata = match &record.metadata {
                Some(m) if !m.is_empty() => Some(serde_json::to_string(m).map_err(|e| {
                    Error::VectorStore(format!("Failed to serialize metadata: {}", e))
                })?),
                _ => None,
            };
            metadatas.push(metadata);
        }

        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| Error::VectorStore(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(documents)),
            Arc::new(StringArray::from(metadatas)),
        ];

        RecordBatch::try_new(collection_schema(self.dimension), arrays)
            .map_err(|e| Error::VectorStore(format!("Failed to create record batch: {}", e)))
    }
}

fn collection_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("document", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, true),
    ]))
}

/// Read the vector width from an existing table's schema
async fn detect_vector_dimension(table: &Table) -> Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(|e| Error::VectorStore(format!("Failed to get table schema: {}", e)))?;

    schema
        .fields()
        .iter()
        .find(|field| field.name() == "vector")
        .and_then(|field| match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
        .ok_or_else(|| {
            Error::VectorStore("Could not find vector column or determine dimension".to_string())
        })
}

async fn parse_result_stream(
    mut results: lancedb::arrow::SendableRecordBatchStream,
) -> Result<Vec<QueryHit>> {
    let mut hits = Vec::new();

    while let Some(batch) = results
        .try_next()
        .await
        .map_err(|e| Error::VectorStore(format!("Failed to read result stream: {}", e)))?
    {
        hits.extend(parse_result_batch(&batch)?);
    }

    debug!("Parsed {} hits from stream", hits.len());
    Ok(hits)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::VectorStore(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::VectorStore(format!("Invalid {} column type", name)))
}

fn parse_result_batch(batch: &RecordBatch) -> Result<Vec<QueryHit>> {
    let ids = string_column(batch, "id")?;
    let documents = string_column(batch, "document")?;
    let metadatas = string_column(batch, "metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let id = ids.value(row).to_string();

        let metadata = if metadatas.is_null(row) {
            None
        } else {
            match serde_json::from_str::<Metadata>(metadatas.value(row)) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("Ignoring unreadable metadata on {}: {}", id, e);
                    None
                }
            }
        };

        let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        hits.push(QueryHit {
            id,
            document: documents.value(row).to_string(),
            metadata,
            distance,
        });
    }

    Ok(hits)
}
