//! Sentence embeddings for transcript segments
//!
//! Turns text into fixed-dimension vectors for similarity search. Two modes:
//!
//! - **ONNX mode** - run a sentence-transformers model (default
//!   `all-MiniLM-L6-v2`, 384 dimensions) locally through ONNX Runtime. Model
//!   and tokenizer are downloaded into the model directory on first use.
//!   Token vectors are mean-pooled over the attention mask and L2-normalized.
//! - **Fast mode** - deterministic hash-seeded vectors of the configured
//!   dimension. No model files; meant for development and tests.
//!
//! A [`SemanticModel`] is loaded once and shared. There is no fallback between
//! modes: if the ONNX assets cannot be loaded, [`SemanticModel::load`] fails.
//!
//! ## Threading notes
//!
//! [`SemanticModel::embed_batch`] is synchronous and CPU-bound. Async callers
//! should run it on the blocking pool (`tokio::task::spawn_blocking`).
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{EmbeddingMode, SemanticConfig, SemanticModel};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = SemanticConfig {
//!         mode: EmbeddingMode::Fast,
//!         ..Default::default()
//!     };
//!     let model = SemanticModel::load(&cfg).await.unwrap();
//!     let vectors = model.embed_batch(&["This is a test."]).unwrap();
//!     assert_eq!(vectors[0].len(), 384);
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod assets;
#[cfg(feature = "onnx")]
mod onnx;
mod pooling;
mod stub;

pub use crate::config::{EmbeddingMode, SemanticConfig};
pub use crate::error::SemanticError;
pub use crate::types::ModelInfo;

use tracing::{info, warn};

use crate::pooling::l2_normalize_in_place;
use crate::stub::stub_embedding;

enum Backend {
    #[cfg(feature = "onnx")]
    Onnx(onnx::OnnxEncoder),
    Stub,
}

/// A loaded embedding model, read-only after [`load`](Self::load).
pub struct SemanticModel {
    info: ModelInfo,
    batch_size: usize,
    backend: Backend,
}

impl std::fmt::Debug for SemanticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticModel")
            .field("info", &self.info)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl SemanticModel {
    /// Load the model described by `cfg`.
    ///
    /// In ONNX mode this resolves (and if needed downloads) the model assets,
    /// builds the session on the blocking pool and probes the output dimension.
    pub async fn load(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;

        match cfg.mode {
            EmbeddingMode::Fast => {
                info!(
                    model = %cfg.model_name,
                    dimension = cfg.dimension,
                    "using deterministic fast embeddings"
                );
                Ok(Self {
                    info: ModelInfo {
                        name: cfg.model_name.clone(),
                        dimension: cfg.dimension,
                        mode: EmbeddingMode::Fast,
                        normalized: cfg.normalize,
                    },
                    batch_size: cfg.batch_size,
                    backend: Backend::Stub,
                })
            }
            EmbeddingMode::Onnx => Self::load_onnx(cfg).await,
        }
    }

    #[cfg(feature = "onnx")]
    async fn load_onnx(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let assets = assets::resolve_model_assets(cfg).await?;
        let intra_threads = cfg.intra_threads;
        let max_sequence_length = cfg.max_sequence_length;

        let encoder = tokio::task::spawn_blocking(move || {
            onnx::OnnxEncoder::load(&assets, intra_threads, max_sequence_length)
        })
        .await
        .map_err(|e| SemanticError::Inference(format!("model load task: {e}")))??;

        let mut model = Self {
            info: ModelInfo {
                name: cfg.model_name.clone(),
                dimension: cfg.dimension,
                mode: EmbeddingMode::Onnx,
                normalized: cfg.normalize,
            },
            batch_size: cfg.batch_size,
            backend: Backend::Onnx(encoder),
        };

        let probed = model
            .embed_batch(&["dimension probe"])?
            .pop()
            .map(|v| v.len())
            .ok_or_else(|| SemanticError::Inference("model returned no outputs".into()))?;
        if probed != cfg.dimension {
            warn!(
                configured = cfg.dimension,
                actual = probed,
                "model output dimension differs from configuration; using the model's"
            );
        }
        model.info.dimension = probed;

        info!(model = %model.info.name, dimension = probed, "embedding model ready");
        Ok(model)
    }

    #[cfg(not(feature = "onnx"))]
    async fn load_onnx(_cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        Err(SemanticError::BackendUnavailable(
            "built without the `onnx` feature; use the `fast` mode".into(),
        ))
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn dimension(&self) -> usize {
        self.info.dimension
    }

    /// Embed `texts`, returning one vector per input in the same order.
    ///
    /// An empty input yields an empty output.
    pub fn embed_batch<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<Vec<f32>>, SemanticError> {
        let mut out = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let mut vectors: Vec<Vec<f32>> = match &self.backend {
                #[cfg(feature = "onnx")]
                Backend::Onnx(encoder) => encoder.embed(chunk)?,
                Backend::Stub => chunk
                    .iter()
                    .map(|t| stub_embedding(t.as_ref(), self.info.dimension))
                    .collect(),
            };

            if vectors.len() != chunk.len() {
                return Err(SemanticError::Inference(format!(
                    "model returned {} vectors for {} inputs",
                    vectors.len(),
                    chunk.len()
                )));
            }
            if self.info.normalized {
                vectors.iter_mut().for_each(|v| l2_normalize_in_place(v));
            }
            out.append(&mut vectors);
        }

        Ok(out)
    }

    /// Embed a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| SemanticError::Inference("model returned no outputs".into()))
    }
}
