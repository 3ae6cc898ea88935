use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty messages are not allowed")]
    EmptyInput,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Generation service error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// HTTP status code this error is reported with
    #[inline]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyInput | Self::InvalidRole(_) => 400,
            Self::Generation(_) => 502,
            Self::Embedding(_)
            | Self::VectorStore(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Other(_) => 500,
        }
    }
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod ingest;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;
