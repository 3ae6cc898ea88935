
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{GENERATOR_PERSONA, GenerationParams, Generator};
use crate::config::Config;
use crate::{Error, Result};

/// Client for an OpenAI-compatible chat-completion router (Hugging Face
/// Inference Providers by default)
#[derive(Debug, Clone)]
pub struct InferenceClient {
    endpoint: Url,
    model: String,
    provider: String,
    api_token: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: String,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl InferenceClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let api_token = config
            .inference
            .api_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| Error::Config("HF_TOKEN not set".to_string()))?;

        let base = config.inference_url()?;
        let endpoint = Url::parse(&format!(
            "{}/chat/completions",
            base.as_str().trim_end_matches('/')
        ))
        .map_err(|e| Error::Config(format!("Invalid inference URL: {}", e)))?;

        // No global timeout; non-2xx bodies are read for the error message
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.inference.model.clone(),
            provider: config.inference.provider.clone(),
            api_token,
            agent,
        })
    }

    /// Model identifier as sent to the router, `model:provider`
    #[inline]
    pub fn routed_model(&self) -> String {
        let provider = self.provider.trim();
        if provider.is_empty() || provider == "auto" {
            self.model.clone()
        } else {
            format!("{}:{}", self.model, provider)
        }
    }

    /// Blocking completion call
    #[inline]
    pub fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        let request = CompletionRequest {
            model: self.routed_model(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: GENERATOR_PERSONA,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| Error::Generation(format!("Failed to serialize request: {}", e)))?;

        debug!(
            "Requesting completion from {} with model {}",
            self.endpoint, request.model
        );

        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .map_err(|e| Error::Generation(format!("HuggingFace API error: {}", e)))?;

        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Generation(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            warn!("Completion request failed with status {}", status);
            return Err(Error::Generation(format!(
                "HuggingFace API error ({}): {}",
                status,
                body.trim()
            )));
        }

        let completion: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Generation(format!("Failed to parse completion: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Generation("Completion returned no choices".to_string()))?;

        Ok(choice
            .message
            .content
            .map(|content| content.trim().to_string())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Generator for InferenceClient {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        let client = self.clone();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || client.complete(&prompt, params))
            .await
            .map_err(|e| Error::Generation(format!("Generation task failed: {}", e)))?
    }
}
