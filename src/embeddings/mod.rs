// Embeddings module
// Turns text into vectors through an external embedding service

pub mod ollama;

use async_trait::async_trait;

pub use ollama::OllamaClient;

/// Converts texts into embedding vectors, one vector per input text.
///
/// Implementations fail the whole batch on the first error; callers never
/// see partial results.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> crate::Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::Error::Embedding("no embedding returned".to_string()))
    }
}
