use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ragpipe_core::{ChunkingStrategy, IngestPolicy, Settings, StoreBackend};
use ragpipe_telemetry::LogFormat;

#[derive(Parser)]
#[command(name = "ragpipe")]
#[command(about = "Answer questions from your own documents with a local LLM", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, default_value = "info", help = "Log level when RUST_LOG is unset")]
    pub log_level: String,

    #[arg(long, global = true, default_value = "text", help = "Log format: text or json")]
    pub log_format: LogFormat,

    #[arg(short, long, global = true, help = "Directory of .txt documents")]
    pub documents: Option<PathBuf>,

    #[arg(long, global = true, help = "Vector store: memory or milvus")]
    pub store: Option<StoreBackend>,

    #[arg(long, global = true, help = "Ollama base URL")]
    pub ollama_url: Option<String>,

    #[arg(long, global = true, help = "Milvus base URI")]
    pub milvus_uri: Option<String>,

    #[arg(long, global = true, help = "Chunking strategy: fixed or recursive")]
    pub chunking: Option<ChunkingStrategy>,

    #[arg(long, global = true, help = "Number of chunks retrieved per question")]
    pub top_k: Option<usize>,

    #[arg(long, global = true, help = "Chunks embedded in parallel during ingestion")]
    pub concurrency: Option<usize>,

    #[arg(long, global = true, help = "Keep going when a chunk fails to embed or store")]
    pub best_effort: bool,

    #[arg(long, global = true, help = "Do not ingest the documents directory first")]
    pub skip_ingest: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Ingest every document and print a summary")]
    Ingest {
        #[arg(long, help = "Clear the vector store first")]
        reset: bool,
    },

    #[command(about = "Answer a single question")]
    Ask {
        #[arg(help = "The question to answer")]
        query: String,
    },

    #[command(about = "Start an interactive question session")]
    Chat,

    #[command(about = "Serve the HTTP API")]
    Serve {
        #[arg(long, help = "Bind host (overrides RAGPIPE_HOST)")]
        host: Option<String>,

        #[arg(short, long, help = "Bind port (overrides RAGPIPE_PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Probe the embedding, store and generation backends")]
    Check,
}

impl Cli {
    /// Apply explicit flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.documents {
            settings.documents_dir = dir.clone();
        }
        if let Some(store) = self.store {
            settings.store.backend = store;
        }
        if let Some(url) = &self.ollama_url {
            settings.ollama.base_url = url.clone();
        }
        if let Some(uri) = &self.milvus_uri {
            settings.store.milvus_uri = uri.clone();
        }
        if let Some(chunking) = self.chunking {
            settings.chunking = chunking;
        }
        if let Some(top_k) = self.top_k {
            settings.rag.top_k = top_k;
        }
        if let Some(concurrency) = self.concurrency {
            settings.rag.concurrency = concurrency;
        }
        if self.best_effort {
            settings.rag.ingest_policy = IngestPolicy::BestEffort;
        }
        if let Commands::Serve { host, port } = &self.command {
            if let Some(host) = host {
                settings.server.host = host.clone();
            }
            if let Some(port) = port {
                settings.server.port = *port;
            }
        }
    }
}
