// Generation module
// Hosted chat-completion models that turn a composed prompt into a reply

pub mod inference;

use async_trait::async_trait;

pub use inference::InferenceClient;

/// System turn sent ahead of every composed prompt
pub const GENERATOR_PERSONA: &str = "You are a helpful assistant. \
Use only the given context; if insufficient, say so. \
Always reply in the same language AND script as the user input. \
If the user mixes English and Hindi in Latin letters (Hinglish), continue in Hinglish (Latin). \
Do not transliterate or change the script.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

/// Produces reply text for a composed prompt
#[async_trait]
pub trait Generator: Send + Sync {
    /// Trimmed text of the first completion choice. May be empty.
    async fn generate(&self, prompt: &str, params: GenerationParams) -> crate::Result<String>;
}
