
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

use super::history::{trim_history, validate_roles};
use super::prompt::compose_prompt;
use super::retrieval::Retriever;
use super::smalltalk::{is_chitchat, smalltalk_reply};
use super::{ChatMeta, ChatResponse, Message, Mode, Source};
use crate::config::Config;
use crate::generation::{GenerationParams, Generator};
use crate::{Error, Result};

/// Sent instead of an empty model reply
pub const FRIENDLY_FALLBACK: &str = "I’m here! 😊 How can I help you today?";

/// Static settings the request handler reports and applies
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub provider: String,
    pub history_budget: usize,
    pub generation: GenerationParams,
}

impl ChatSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.inference.model.clone(),
            provider: config.inference.provider.clone(),
            history_budget: config.chat.max_history_chars,
            generation: GenerationParams {
                temperature: config.inference.temperature,
                max_tokens: config.inference.max_tokens,
            },
        }
    }
}

/// Answers one conversation at a time: validate, trim, short-circuit
/// smalltalk, otherwise retrieve context and generate a reply
pub struct ChatService {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    settings: ChatSettings,
    rng: Mutex<StdRng>,
}

impl ChatService {
    #[inline]
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>, settings: ChatSettings) -> Self {
        Self {
            retriever,
            generator,
            settings,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replace the random source used to pick smalltalk replies
    #[inline]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    #[inline]
    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    #[inline]
    pub async fn respond(&self, messages: Vec<Message>, mode: Mode) -> Result<ChatResponse> {
        let started = Instant::now();

        if messages.is_empty() {
            return Err(Error::EmptyInput);
        }

        validate_roles(&messages)?;
        let messages = trim_history(&messages, self.settings.history_budget);
        let user_input = messages
            .last()
            .map(|m| m.content.as_str())
            .ok_or(Error::EmptyInput)?;

        if is_chitchat(user_input) {
            debug!("Answering smalltalk without retrieval");
            let reply = {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                smalltalk_reply(&mut *rng)
            };
            return Ok(ChatResponse {
                reply: reply.to_string(),
                raw_json: None,
                meta: self.meta(mode, Source::Smalltalk, started, None),
            });
        }

        let retrieval = self.retriever.retrieve(user_input).await.into_result();

        let prompt = compose_prompt(&retrieval.context_text, user_input);
        let mut reply = self
            .generator
            .generate(&prompt, self.settings.generation)
            .await?;
        if reply.is_empty() {
            reply = FRIENDLY_FALLBACK.to_string();
        }

        let meta = self.meta(mode, Source::Llm, started, Some(retrieval.count));
        info!(
            "Answered with {} retrieved chunks in {} ms",
            retrieval.count, meta.t_ms
        );

        Ok(ChatResponse {
            reply,
            raw_json: None,
            meta,
        })
    }

    fn meta(
        &self,
        mode: Mode,
        source: Source,
        started: Instant,
        retrieved_count: Option<usize>,
    ) -> ChatMeta {
        ChatMeta {
            model: self.settings.model.clone(),
            mode,
            provider: self.settings.provider.clone(),
            source,
            t_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            retrieved_count,
        }
    }
}
