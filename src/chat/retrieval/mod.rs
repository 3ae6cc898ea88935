
use itertools::Itertools;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Result;
use crate::database::VectorIndex;
use crate::database::lancedb::{Metadata, QueryHit};
use crate::embeddings::Embedder;

/// Separator placed between retrieved chunks in the context blob
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Context assembled from the nearest documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub context_text: String,
    pub count: usize,
}

/// Outcome of a retrieval attempt. Retrieval is best effort: a failure
/// anywhere in the step is reported as `Degraded` rather than as an error.
#[derive(Debug)]
pub enum Retrieval {
    Found(RetrievalResult),
    Degraded(crate::Error),
}

impl Retrieval {
    /// The retrieved context, or an empty one when retrieval failed
    #[inline]
    pub fn into_result(self) -> RetrievalResult {
        match self {
            Self::Found(result) => result,
            Self::Degraded(_) => RetrievalResult::default(),
        }
    }
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    /// Embed the query, fetch the `top_k` nearest documents and assemble
    /// them into a context blob
    #[inline]
    pub async fn retrieve(&self, query: &str) -> Retrieval {
        match self.try_retrieve(query).await {
            Ok(result) => Retrieval::Found(result),
            Err(e) => {
                warn!("Retrieval failed, continuing without context: {}", e);
                Retrieval::Degraded(e)
            }
        }
    }

    async fn try_retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let embedding = self.embedder.embed_one(query).await?;
        let hits = self.index.query(&embedding, self.top_k).await?;

        for hit in &hits {
            debug!("Retrieved {} at distance {}", hit.id, hit.distance);
        }

        Ok(assemble_context(&hits))
    }
}

/// Join hit documents into one blob, annotating each with its metadata
#[inline]
pub fn assemble_context(hits: &[QueryHit]) -> RetrievalResult {
    let context_text = hits
        .iter()
        .map(|hit| match &hit.metadata {
            Some(metadata) if !metadata.is_empty() => {
                format!("{}\n[{}]", hit.document, flatten_metadata(metadata))
            }
            _ => hit.document.clone(),
        })
        .join(CHUNK_SEPARATOR);

    RetrievalResult {
        context_text,
        count: hits.len(),
    }
}

/// Render metadata as `key:value` pairs separated by spaces. Strings are
/// written bare, other values as JSON.
#[inline]
pub fn flatten_metadata(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}:{}", key, s),
            other => format!("{}:{}", key, other),
        })
        .join(" ")
}
