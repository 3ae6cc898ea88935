// Database module
// Persistent vector collections and the query seam used by retrieval


pub mod lancedb;

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use self::lancedb::QueryHit;
use self::lancedb::vector_store::VectorStore;
use crate::Result;
use crate::config::StoreConfig;

/// Nearest-neighbour lookup over a collection of embedded documents
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` hits ordered by ascending distance
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>>;
}

/// A named collection in a path-addressed store. Every query opens a fresh
/// handle, creating the collection with the query's width if it does not
/// exist yet.
#[derive(Debug, Clone)]
pub struct StoreIndex {
    path: PathBuf,
    collection: String,
}

impl StoreIndex {
    #[inline]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            path: config.path.clone(),
            collection: config.collection.clone(),
        }
    }
}

#[async_trait]
impl VectorIndex for StoreIndex {
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        debug!(
            "Querying collection {} at {} for {} neighbours",
            self.collection,
            self.path.display(),
            k
        );
        let store = VectorStore::open(&self.path).await?;
        let collection = store
            .get_or_create_collection(&self.collection, embedding.len())
            .await?;
        collection.query(embedding, k).await
    }
}
