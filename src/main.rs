use clap::{Parser, Subcommand};
use guide_rag::Result;
use guide_rag::commands::{ingest, serve, show_config, show_status};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guide-rag")]
#[command(about = "Retrieval-augmented chat backend for a travel guide")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./guide-rag.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat server
    Serve {
        /// Address to bind, overrides SERVER_HOST
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides SERVER_PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Embed text files and store them in the vector collection
    Ingest {
        /// Text files to ingest; pages are separated by form feeds
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Collection to write into, overrides COLLECTION_NAME
        #[arg(long)]
        collection: Option<String>,
    },
    /// Show the vector store and embedding service status
    Status,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            serve(config_path, host, port).await?;
        }
        Commands::Ingest { files, collection } => {
            ingest(config_path, &files, collection).await?;
        }
        Commands::Status => {
            show_status(config_path).await?;
        }
        Commands::Config => {
            show_config(config_path)?;
        }
    }

    Ok(())
}
