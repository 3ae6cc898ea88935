use anyhow::{Context, Result};
use console::style;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::retrieval::Retriever;
use crate::chat::{ChatService, ChatSettings};
use crate::config::Config;
use crate::database::StoreIndex;
use crate::database::lancedb::VectorStore;
use crate::embeddings::ollama::OllamaClient;
use crate::generation::inference::InferenceClient;
use crate::ingest::ingest_files;
use crate::server;

/// Build the request handler from configuration
#[inline]
pub fn build_service(config: &Config) -> Result<ChatService> {
    let embedder = OllamaClient::new(config).context("Failed to create embedding client")?;
    let generator = InferenceClient::new(config).context("Failed to create inference client")?;
    let index = StoreIndex::new(&config.store);
    let retriever = Retriever::new(Arc::new(embedder), Arc::new(index), config.store.top_k);

    Ok(ChatService::new(
        retriever,
        Arc::new(generator),
        ChatSettings::from_config(config),
    ))
}

/// Start the HTTP server
#[inline]
pub async fn serve(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let probe = OllamaClient::new(&config)?;
    match tokio::task::spawn_blocking(move || probe.health_check()).await? {
        Ok(()) => info!(
            "Ollama reachable at {} with model {}",
            config.ollama.base_url, config.ollama.model
        ),
        Err(e) => warn!(
            "Ollama at {} is not ready, answers will have no context: {}",
            config.ollama.base_url, e
        ),
    }

    let service = Arc::new(build_service(&config)?);
    info!(
        "Serving collection {} from {} with model {}",
        config.store.collection,
        config.store.path.display(),
        service.settings().model
    );

    tokio::select! {
        result = server::serve(addr, service) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n📴 Received interrupt signal, shutting down...");
        }
    }

    Ok(())
}

/// Embed text files and store them in the collection
#[inline]
pub async fn ingest(
    config_path: Option<&Path>,
    files: &[PathBuf],
    collection: Option<String>,
) -> Result<()> {
    let mut config =
        Config::load_for_indexing(config_path).context("Failed to load configuration")?;
    if let Some(collection) = collection {
        config.store.collection = collection;
    }

    let embedder = OllamaClient::new(&config)?;
    let store = VectorStore::open(&config.store.path)
        .await
        .context("Failed to open vector store")?;

    let report = ingest_files(files, &embedder, &store, &config.store.collection).await?;

    println!(
        "✅ Ingested {} pages from {} files into {}",
        report.pages,
        report.files,
        style(&config.store.collection).cyan()
    );
    if report.skipped_pages > 0 {
        println!("   Skipped {} blank pages", report.skipped_pages);
    }
    if let Some(collection) = store.open_collection(&config.store.collection).await? {
        println!("   Collection now holds {} documents", collection.count().await?);
    }

    Ok(())
}

/// Show the state of the store and the embedding service
#[inline]
pub async fn show_status(config_path: Option<&Path>) -> Result<()> {
    let config =
        Config::load_for_indexing(config_path).context("Failed to load configuration")?;

    println!("{}", style("📊 Status").bold().cyan());
    println!();

    println!("{}", style("Vector Store:").bold().yellow());
    println!("  Path: {}", style(config.store.path.display()).cyan());
    let store = VectorStore::open(&config.store.path)
        .await
        .context("Failed to open vector store")?;
    if let Some(collection) = store.open_collection(&config.store.collection).await? {
        println!(
            "  Collection: {} ({} documents, {} dimensions)",
            style(collection.name()).cyan(),
            collection.count().await?,
            collection.dimension()
        );
    } else {
        println!(
            "  Collection: {} {}",
            style(&config.store.collection).cyan(),
            style("(not created yet)").dim()
        );
    }

    println!();
    println!("{}", style("Embedding Service:").bold().yellow());
    println!("  URL: {}", style(&config.ollama.base_url).cyan());
    println!("  Model: {}", style(&config.ollama.model).cyan());
    let client = OllamaClient::new(&config)?;
    match tokio::task::spawn_blocking(move || client.health_check()).await? {
        Ok(()) => println!("  Health: {}", style("✅ reachable").green()),
        Err(e) => println!("  Health: {} ({})", style("❌ unavailable").red(), e),
    }

    Ok(())
}

/// Print the effective configuration with secrets masked
#[inline]
pub fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config =
        Config::load_for_indexing(config_path).context("Failed to load configuration")?;
    let rendered =
        toml::to_string_pretty(&config.redacted()).context("Failed to render configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();
    println!("{}", rendered.trim_end());

    if config.inference.api_token.is_none() {
        println!();
        println!(
            "{}",
            style("HF_TOKEN is not set; 'serve' will refuse to start.").yellow()
        );
    }

    Ok(())
}
