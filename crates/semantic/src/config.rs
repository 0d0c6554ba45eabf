use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::SemanticError;

/// Base URL of the sentence-transformers model repositories.
pub const MODEL_HUB_URL: &str = "https://huggingface.co/sentence-transformers";

/// How embeddings are produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Local ONNX Runtime inference over the downloaded model.
    #[default]
    Onnx,
    /// Deterministic hash-seeded vectors; no model files involved.
    Fast,
}

impl std::str::FromStr for EmbeddingMode {
    type Err = SemanticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "fast" | "stub" => Ok(Self::Fast),
            other => Err(SemanticError::InvalidConfig(format!(
                "unknown embedding mode '{other}' (expected 'onnx' or 'fast')"
            ))),
        }
    }
}

/// Runtime configuration describing which model/tokenizer to use and how to post-process vectors.
///
/// # Example
/// ```no_run
/// use semantic::{SemanticConfig, SemanticModel};
///
/// # async fn run() -> Result<(), semantic::SemanticError> {
/// let cfg = SemanticConfig {
///     model_name: "all-MiniLM-L6-v2".into(),
///     model_dir: "./models".into(),
///     ..Default::default()
/// };
/// let model = SemanticModel::load(&cfg).await?;
/// let vectors = model.embed_batch(&["hello world"])?;
/// assert_eq!(vectors[0].len(), model.dimension());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    pub mode: EmbeddingMode,
    /// Model identifier inside the sentence-transformers hub (also the label
    /// stamped on persisted indexes).
    pub model_name: String,
    /// Root directory; assets live under `<model_dir>/<model_name>/`.
    pub model_dir: PathBuf,
    /// Explicit ONNX file, overriding the location derived from `model_dir`.
    pub model_path: Option<PathBuf>,
    /// Download source used when the ONNX file is missing.
    pub model_url: Option<String>,
    pub tokenizer_path: Option<PathBuf>,
    pub tokenizer_url: Option<String>,
    /// Expected output dimension. The stub produces exactly this many values;
    /// the ONNX backend reports what the model actually emits.
    pub dimension: usize,
    /// Tokens beyond this are truncated.
    pub max_sequence_length: usize,
    /// Normalize the resulting vectors to unit length.
    pub normalize: bool,
    /// Texts per inference call.
    pub batch_size: usize,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Onnx,
            model_name: "all-MiniLM-L6-v2".into(),
            model_dir: PathBuf::from("./models"),
            model_path: None,
            model_url: None,
            tokenizer_path: None,
            tokenizer_url: None,
            dimension: 384,
            max_sequence_length: 256,
            normalize: true,
            batch_size: 32,
            intra_threads: 2,
        }
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.model_name.trim().is_empty() {
            return Err(SemanticError::InvalidConfig("model_name is empty".into()));
        }
        if self.dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "dimension must be greater than zero".into(),
            ));
        }
        if self.max_sequence_length == 0 {
            return Err(SemanticError::InvalidConfig(
                "max_sequence_length must be greater than zero".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SemanticError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    fn model_root(&self) -> PathBuf {
        self.model_dir.join(&self.model_name)
    }

    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| self.model_root().join("onnx").join("model.onnx"))
    }

    pub fn resolved_tokenizer_path(&self) -> PathBuf {
        self.tokenizer_path
            .clone()
            .unwrap_or_else(|| self.model_root().join("tokenizer.json"))
    }

    pub fn resolved_model_url(&self) -> String {
        self.model_url.clone().unwrap_or_else(|| {
            format!(
                "{MODEL_HUB_URL}/{}/resolve/main/onnx/model.onnx",
                self.model_name
            )
        })
    }

    pub fn resolved_tokenizer_url(&self) -> String {
        self.tokenizer_url.clone().unwrap_or_else(|| {
            format!(
                "{MODEL_HUB_URL}/{}/resolve/main/tokenizer.json",
                self.model_name
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.mode, EmbeddingMode::Onnx);
        assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
        assert_eq!(cfg.dimension, 384);
        assert_eq!(cfg.max_sequence_length, 256);
        assert!(cfg.normalize);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn derived_paths_live_under_model_dir() {
        let cfg = SemanticConfig {
            model_dir: PathBuf::from("/srv/models"),
            ..Default::default()
        };
        assert_eq!(
            cfg.resolved_model_path(),
            PathBuf::from("/srv/models/all-MiniLM-L6-v2/onnx/model.onnx")
        );
        assert_eq!(
            cfg.resolved_tokenizer_path(),
            PathBuf::from("/srv/models/all-MiniLM-L6-v2/tokenizer.json")
        );
    }

    #[test]
    fn explicit_paths_and_urls_win() {
        let cfg = SemanticConfig {
            model_path: Some(PathBuf::from("/tmp/m.onnx")),
            tokenizer_url: Some("https://example.com/tok.json".into()),
            ..Default::default()
        };
        assert_eq!(cfg.resolved_model_path(), PathBuf::from("/tmp/m.onnx"));
        assert_eq!(cfg.resolved_tokenizer_url(), "https://example.com/tok.json");
        assert_eq!(
            cfg.resolved_model_url(),
            "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx"
        );
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("ONNX".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Onnx);
        assert_eq!("fast".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Fast);
        assert!("api".parse::<EmbeddingMode>().is_err());
    }

    #[test]
    fn mode_serde_is_lowercase() {
        let json = serde_json::to_string(&EmbeddingMode::Fast).unwrap();
        assert_eq!(json, "\"fast\"");
    }

    #[test]
    fn validate_rejects_zero_dimension() {
        let cfg = SemanticConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SemanticError::InvalidConfig(_))
        ));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: SemanticConfig = serde_json::from_str(r#"{"mode":"fast"}"#).unwrap();
        assert_eq!(cfg.mode, EmbeddingMode::Fast);
        assert_eq!(cfg.dimension, 384);
    }
}
