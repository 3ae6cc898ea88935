//! In-process stand-ins for the external services, recording every call

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::database::VectorIndex;
use crate::database::lancedb::{Metadata, QueryHit};
use crate::embeddings::Embedder;
use crate::generation::{GenerationParams, Generator};
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct FakeEmbedder {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("connection refused".to_string()));
        }
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }
}

#[derive(Debug, Default)]
pub struct FakeIndex {
    hits: Vec<QueryHit>,
    fail: bool,
    calls: AtomicUsize,
    last_k: AtomicUsize,
}

impl FakeIndex {
    pub fn with_hits(hits: Vec<QueryHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_k(&self) -> usize {
        self.last_k.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn query(&self, _embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_k.store(k, Ordering::SeqCst);
        if self.fail {
            return Err(Error::VectorStore("table is corrupt".to_string()));
        }
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

#[derive(Debug)]
pub struct FakeGenerator {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        self.reply.clone().map_err(Error::Generation)
    }
}

pub fn hit(id: &str, document: &str, metadata: Option<Metadata>, distance: f32) -> QueryHit {
    QueryHit {
        id: id.to_string(),
        document: document.to_string(),
        metadata,
        distance,
    }
}
