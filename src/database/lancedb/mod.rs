// LanceDB vector database module
// Named collections of (id, vector, document, metadata) rows


pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{Collection, VectorStore};

/// Free-form metadata attached to a document; keys keep insertion order
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Row written into a collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionRecord {
    /// Unique identifier; writing an existing id replaces the row
    pub id: String,
    pub vector: Vec<f32>,
    /// The text that was embedded
    pub document: String,
    pub metadata: Option<Metadata>,
}

/// One nearest-neighbour match
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Option<Metadata>,
    pub distance: f32,
}
