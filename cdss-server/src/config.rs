//! Command-line and environment configuration for the `cdss` binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use cdss_graph::DEFAULT_MAX_THREADS;
use cdss_model::groq::{DEFAULT_MODEL, DEFAULT_TEMPERATURE, GROQ_API_BASE, GroqConfig};
use cdss_rag::openai::{
    DEFAULT_EMBEDDING_BASE_URL, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
use cdss_rag::{EmbeddingConfig, RagConfig, SplitterKind};
use clap::{Args, Parser, Subcommand};

use crate::server::ServerConfig;

/// Thread used by `/bot` and `cdss ask` when the caller names none.
pub const DEFAULT_THREAD_ID: &str = "streamlit-thread-1";

/// Heart failure guideline clinical decision support.
#[derive(Parser, Debug)]
#[command(name = "cdss", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve `/bot`, the CDS Hooks endpoints and thread inspection over HTTP
    Serve {
        /// Load and index the guideline before the first request
        #[arg(long)]
        warm: bool,
    },
    /// Answer one question and exit
    Ask {
        question: String,
        #[arg(long, default_value = DEFAULT_THREAD_ID)]
        thread: String,
    },
    /// Build or validate the persisted index
    Index,
    /// Chat with a running server from the terminal
    Chat {
        /// Server root URL, or its `/bot` endpoint
        #[arg(long, env = "BACKEND_API_URL", default_value = "http://127.0.0.1:8000")]
        backend: String,
        #[arg(long, default_value = DEFAULT_THREAD_ID)]
        thread: String,
    },
}

/// Settings shared by every subcommand. Each flag falls back to an
/// environment variable, and `.env` is loaded before parsing.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    #[arg(long, env = "CDSS_HOST", default_value = "127.0.0.1", global = true)]
    pub host: String,

    #[arg(long, env = "CDSS_PORT", default_value_t = 8000, global = true)]
    pub port: u16,

    /// Guideline PDF or text file
    #[arg(long, env = "CDSS_GUIDELINE_PATH", default_value = "data/HF_Guideline.pdf", global = true)]
    pub guideline_path: PathBuf,

    /// Directory holding the persisted index
    #[arg(long, env = "CDSS_INDEX_DIR", default_value = "index_db", global = true)]
    pub index_dir: PathBuf,

    #[arg(long, env = "CDSS_COLLECTION", default_value = "guideline", global = true)]
    pub collection: String,

    #[arg(long, env = "CDSS_CHUNK_SIZE", default_value_t = 1000, global = true)]
    pub chunk_size: usize,

    #[arg(long, env = "CDSS_CHUNK_OVERLAP", default_value_t = 200, global = true)]
    pub chunk_overlap: usize,

    #[arg(long, env = "CDSS_TOP_K", default_value_t = 7, global = true)]
    pub top_k: usize,

    /// `fixed` or `recursive`
    #[arg(long, env = "CDSS_SPLITTER", default_value = "fixed", global = true)]
    pub splitter: SplitterKind,

    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, global = true)]
    pub groq_api_key: Option<String>,

    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub groq_model: String,

    #[arg(long, env = "GROQ_BASE_URL", default_value = GROQ_API_BASE, global = true)]
    pub groq_base_url: String,

    #[arg(long, env = "CDSS_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE, global = true)]
    pub temperature: f32,

    /// Timeout for each model and embedding request, in seconds
    #[arg(long, env = "CDSS_REQUEST_TIMEOUT", default_value_t = 60, global = true)]
    pub request_timeout: u64,

    /// Conversation threads kept in memory before the least recently used is dropped
    #[arg(long, env = "CDSS_MAX_THREADS", default_value_t = DEFAULT_MAX_THREADS, global = true)]
    pub max_threads: usize,

    #[arg(long, env = "EMBEDDING_BASE_URL", default_value = DEFAULT_EMBEDDING_BASE_URL, global = true)]
    pub embedding_base_url: String,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    pub embedding_model: String,

    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS, global = true)]
    pub embedding_dimensions: usize,

    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true, global = true)]
    pub embedding_api_key: Option<String>,

    /// Chat front end linked from CDS cards
    #[arg(long, env = "CDSS_FRONTEND_URL", global = true)]
    pub frontend_url: Option<String>,
}

impl Settings {
    pub fn rag_config(&self) -> anyhow::Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .splitter(self.splitter)
            .top_k(self.top_k)
            .collection(self.collection.clone())
            .persist_dir(self.index_dir.clone())
            .build()
            .context("invalid retrieval settings")
    }

    pub fn groq_config(&self) -> anyhow::Result<GroqConfig> {
        let api_key = self
            .groq_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .context("GROQ_API_KEY is not set")?;
        Ok(GroqConfig::new(api_key, self.groq_model.clone())
            .with_base_url(self.groq_base_url.clone())
            .with_temperature(self.temperature)
            .with_timeout(self.timeout()))
    }

    pub fn embedding_config(&self) -> EmbeddingConfig {
        let config = EmbeddingConfig { timeout: self.timeout(), ..EmbeddingConfig::default() }
            .with_base_url(self.embedding_base_url.clone())
            .with_model(self.embedding_model.clone(), self.embedding_dimensions);
        match &self.embedding_api_key {
            Some(key) if !key.trim().is_empty() => config.with_api_key(key.clone()),
            _ => config,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig { host: self.host.clone(), port: self.port }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }
}
