use std::io;
use thiserror::Error;

/// Errors surfaced while loading a model or embedding text.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// The ONNX model could not be located locally or fetched.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("tokenizer missing: {0}")]
    TokenizerMissing(String),
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Unable to download remote assets.
    #[error("download failed: {0}")]
    Download(String),
    /// The requested mode is not compiled into this build.
    #[error("embedding backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// ONNX Runtime, tokenizer, or pooling errors.
    #[error("inference failure: {0}")]
    Inference(String),
}

impl From<fetch::FetchError> for SemanticError {
    fn from(err: fetch::FetchError) -> Self {
        match err {
            fetch::FetchError::Io(err) => SemanticError::Io(err),
            other => SemanticError::Download(other.to_string()),
        }
    }
}
