use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use index::{CompressionCodec, CompressionConfig, IndexPaths, IndexStoreConfig};
use semantic::{EmbeddingMode, SemanticConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Transcription service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port (`WHISPER_PORT`)
    #[serde(default = "default_whisper_port")]
    pub whisper_port: u16,

    /// Speech model size (`WHISPER_MODEL`)
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,

    /// Where model weights are kept and downloaded to (`MODEL_DIR`)
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Inference threads handed to the speech model
    #[serde(default = "default_whisper_threads")]
    pub whisper_threads: usize,

    /// Maximum request body size in MB
    #[serde(default = "default_transcription_body_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            whisper_port: default_whisper_port(),
            whisper_model: default_whisper_model(),
            model_dir: default_model_dir(),
            whisper_threads: default_whisper_threads(),
            max_body_size_mb: default_transcription_body_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl TranscriptionConfig {
    /// Load configuration from an optional `transcription.*` file, overridden
    /// by environment variables.
    pub fn load() -> anyhow::Result<Self> {
        build(config::Config::builder().add_source(File::with_name("transcription").required(false)))
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        socket_addr(&self.bind_addr, self.whisper_port)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

/// Embedding & search service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port (`EMBEDDING_PORT`)
    #[serde(default = "default_embedding_port")]
    pub embedding_port: u16,

    /// Sentence-transformers model name (`EMBEDDING_MODEL`)
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Root directory for embedding model assets (`EMBEDDING_MODEL_DIR`)
    #[serde(default = "default_model_dir")]
    pub embedding_model_dir: PathBuf,

    /// `onnx` or `fast` (`EMBEDDING_MODE`)
    #[serde(default)]
    pub embedding_mode: EmbeddingMode,

    /// Vector dimension produced by `fast` mode and expected from the model
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Intra-op threads for the ONNX session
    #[serde(default = "default_embedding_threads")]
    pub embedding_threads: usize,

    /// Binary vector file (`FAISS_INDEX_PATH`)
    #[serde(default = "default_index_path")]
    pub faiss_index_path: PathBuf,

    /// JSON metadata sidecar (`METADATA_PATH`)
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Codec for the vector file: `zstd` or `none`
    #[serde(default)]
    pub index_compression: CompressionCodec,

    /// Maximum request body size in MB
    #[serde(default = "default_embedding_body_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            embedding_port: default_embedding_port(),
            embedding_model: default_embedding_model(),
            embedding_model_dir: default_model_dir(),
            embedding_mode: EmbeddingMode::default(),
            embedding_dimension: default_embedding_dimension(),
            embedding_threads: default_embedding_threads(),
            faiss_index_path: default_index_path(),
            metadata_path: default_metadata_path(),
            index_compression: CompressionCodec::default(),
            max_body_size_mb: default_embedding_body_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl EmbeddingConfig {
    /// Load configuration from an optional `embedding.*` file, overridden by
    /// environment variables.
    pub fn load() -> anyhow::Result<Self> {
        build(config::Config::builder().add_source(File::with_name("embedding").required(false)))
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        socket_addr(&self.bind_addr, self.embedding_port)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn semantic(&self) -> SemanticConfig {
        SemanticConfig {
            mode: self.embedding_mode,
            model_name: self.embedding_model.clone(),
            model_dir: self.embedding_model_dir.clone(),
            dimension: self.embedding_dimension,
            intra_threads: self.embedding_threads,
            ..SemanticConfig::default()
        }
    }

    pub fn index_store(&self) -> IndexStoreConfig {
        IndexStoreConfig {
            paths: IndexPaths::new(&self.faiss_index_path, &self.metadata_path),
            compression: CompressionConfig::default().with_codec(self.index_compression),
        }
    }
}

/// Environment variables map onto fields by lower-casing their names
/// (`WHISPER_PORT` -> `whisper_port`). Unrelated variables are ignored.
fn build<T: serde::de::DeserializeOwned>(
    builder: ConfigBuilder<DefaultState>,
) -> anyhow::Result<T> {
    let config = builder
        .add_source(Environment::default().try_parsing(true))
        .build()?
        .try_deserialize()?;
    Ok(config)
}

fn socket_addr(bind_addr: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let addr_str = format!("{bind_addr}:{port}");
    Ok(addr_str.parse()?)
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_whisper_port() -> u16 {
    5000
}

fn default_embedding_port() -> u16 {
    5001
}

fn default_whisper_model() -> String {
    "medium".to_string()
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_whisper_threads() -> usize {
    4
}

fn default_embedding_threads() -> usize {
    2
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./storage/faiss_index")
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("./storage/faiss_metadata.json")
}

fn default_transcription_body_mb() -> usize {
    1
}

// Index batches carry whole embedding arrays as JSON.
fn default_embedding_body_mb() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
