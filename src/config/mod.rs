// Configuration management module
// Defaults, optional TOML file, then environment overrides

pub mod settings;

pub use settings::{
    ChatConfig, Config, ConfigError, DEFAULT_CONFIG_FILE, InferenceConfig, OllamaConfig,
    ServerConfig, StoreConfig,
};
