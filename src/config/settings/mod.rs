
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::chat::history::DEFAULT_HISTORY_BUDGET;

/// File picked up from the working directory when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "guide-rag.toml";

const REDACTED: &str = "********";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub ollama: OllamaConfig,
    pub inference: InferenceConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the persistent vector collections
    pub path: PathBuf,
    pub collection: String,
    pub top_k: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./Sikkim_db"),
            collection: "Sikkim".to_string(),
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "embeddinggemma:latest".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            provider: "novita".to_string(),
            model: "openai/gpt-oss-120b".to_string(),
            base_url: "https://router.huggingface.co/v1".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Character budget for the trimmed conversation
    pub max_history_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_chars: DEFAULT_HISTORY_BUDGET,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HF_TOKEN not set (inference.api_token is required)")]
    MissingApiToken,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid collection name: {0:?} (cannot be empty)")]
    InvalidCollection(String),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid temperature: {0} (must be between 0 and 2)")]
    InvalidTemperature(f32),
    #[error("Invalid max_tokens: {0} (must be at least 1)")]
    InvalidMaxTokens(u32),
    #[error("Invalid history budget: {0} (must be at least 1)")]
    InvalidHistoryBudget(usize),
    #[error("Invalid timeout: {0} (must be at least 1 second)")]
    InvalidTimeout(u64),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnvValue { key: String, value: String },
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl From<ConfigError> for crate::Error {
    #[inline]
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl Config {
    /// Load defaults, the optional TOML file, then the process environment,
    /// and validate the result
    #[inline]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::resolve(path)?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(config)
    }

    /// Like [`Config::load`] but only validates the sections needed to reach
    /// the store and the embedding service, so offline tools run without an
    /// inference token
    #[inline]
    pub fn load_for_indexing(path: Option<&Path>) -> Result<Self> {
        let config = Self::resolve(path)?;
        config
            .store
            .validate()
            .and_then(|()| config.ollama.validate())
            .context("Configuration validation failed")?;
        Ok(config)
    }

    fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config
            .apply_overrides(|key| std::env::var(key).ok())
            .context("Failed to apply environment overrides")?;
        Ok(config)
    }

    /// Read the TOML file at `path`, or `guide-rag.toml` in the working
    /// directory when no path is given. A missing default file yields defaults.
    #[inline]
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()).into());
                }
                path.to_path_buf()
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    /// Apply environment-style overrides. `lookup` returns the value of a
    /// variable, if set.
    #[inline]
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "SERVER_PORT")? {
            self.server.port = port;
        }
        if let Some(path) = lookup("CHROMA_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(collection) = lookup("COLLECTION_NAME") {
            self.store.collection = collection;
        }
        if let Some(top_k) = parse_var(&lookup, "TOP_K")? {
            self.store.top_k = top_k;
        }
        if let Some(base_url) = lookup("OLLAMA_BASE") {
            self.ollama.base_url = base_url;
        }
        if let Some(model) = lookup("OLLAMA_EMBED_MODEL") {
            self.ollama.model = model;
        }
        if let Some(token) = lookup("HF_TOKEN") {
            self.inference.api_token = Some(token);
        }
        if let Some(provider) = lookup("HF_PROVIDER") {
            self.inference.provider = provider;
        }
        if let Some(model) = lookup("HF_MODEL") {
            self.inference.model = model;
        }
        if let Some(base_url) = lookup("HF_BASE_URL") {
            self.inference.base_url = base_url;
        }
        if let Some(budget) = parse_var(&lookup, "MAX_HISTORY_CHARS")? {
            self.chat.max_history_chars = budget;
        }
        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }
        self.store.validate()?;
        self.ollama.validate()?;
        self.inference.validate()?;
        if self.chat.max_history_chars == 0 {
            return Err(ConfigError::InvalidHistoryBudget(
                self.chat.max_history_chars,
            ));
        }
        Ok(())
    }

    /// Base URL of the embedding service
    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        parse_http_url(&self.ollama.base_url)
    }

    /// Base URL of the chat-completion service
    #[inline]
    pub fn inference_url(&self) -> Result<Url, ConfigError> {
        parse_http_url(&self.inference.base_url)
    }

    /// Copy of the configuration that is safe to print
    #[inline]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.inference.api_token.is_some() {
            config.inference.api_token = Some(REDACTED.to_string());
        }
        config
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        Ok(())
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_http_url(&self.base_url)?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }
        Ok(())
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.api_token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingApiToken),
        }
        parse_http_url(&self.base_url)?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }
        Ok(())
    }
}

fn parse_http_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
    }
    Ok(url)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    key: key.to_string(),
                    value,
                })
        })
        .transpose()
}
