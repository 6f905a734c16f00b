use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

use docs_rag::chunking::{ChunkOptions, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use docs_rag::database::{QdrantConfig, QdrantStore};
use docs_rag::loader;
use docs_rag::openai::{OpenAiClient, OpenAiConfig};
use docs_rag::rag::RagEngine;

/// A RAG (Retrieval-Augmented Generation) application using OpenAI models and Qdrant
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a file or directory, chunk it and store it in the vector index
    Ingest {
        /// File or directory (txt, pdf, docx, pptx, xlsx, xls)
        path: PathBuf,

        /// Maximum chunk length in characters
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Characters shared by consecutive chunks
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,
    },
    /// Answer a single question
    Ask {
        question: String,
    },
    /// Answer questions interactively
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Validate chunking options before touching any service
    let options = match &args.command {
        Command::Ingest {
            chunk_size,
            chunk_overlap,
            ..
        } => Some(ChunkOptions::new(*chunk_size, *chunk_overlap)?),
        _ => None,
    };

    // Load configuration from environment
    let qdrant_config = QdrantConfig::from_env().context("Invalid Qdrant configuration")?;
    let openai_config = OpenAiConfig::from_env().context("Missing OPENAI_API_KEY")?;

    let openai = Arc::new(OpenAiClient::new(openai_config));
    let store = QdrantStore::connect(qdrant_config, openai.clone())
        .await
        .context("Failed to initialize Qdrant collection")?;
    info!("Connected to collection {}", store.collection());

    let rag_engine = RagEngine::new(Arc::new(store), openai);

    match args.command {
        Command::Ingest { path, .. } => {
            let options = options.unwrap_or_default();
            info!("Loading documents from {}", path.display());

            let chunks = tokio::task::spawn_blocking(move || loader::load(&path, &options))
                .await
                .context("Document loader crashed")??;

            if rag_engine.ingest(&chunks).await {
                info!("Ingested {} chunks", chunks.len());
            } else {
                error!("Nothing was ingested");
            }
        }
        Command::Ask { question } => {
            let answer = rag_engine.ask(&question).await?;
            println!("{}", answer);
        }
        Command::Chat => {
            rag_engine
                .run_query_loop()
                .await
                .context("Error in query loop")?;
        }
    }

    Ok(())
}
