#![cfg_attr(not(feature = "onnx"), allow(dead_code))]

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{SemanticConfig, SemanticError};

#[derive(Debug)]
pub(crate) struct ModelAssets {
    pub(crate) model_path: PathBuf,
    pub(crate) tokenizer_path: PathBuf,
}

/// Ensures that the model and tokenizer exist locally, downloading them when missing.
pub(crate) async fn resolve_model_assets(
    cfg: &SemanticConfig,
) -> Result<ModelAssets, SemanticError> {
    let model_target = cfg.resolved_model_path();
    let model_path = ensure_local_file(&model_target, &cfg.resolved_model_url())
        .await
        .map_err(|err| match err {
            SemanticError::Download(msg) => SemanticError::ModelNotFound(format!(
                "{} ({msg})",
                model_target.display()
            )),
            other => other,
        })?;

    let tokenizer_target = cfg.resolved_tokenizer_path();
    let tokenizer_path = ensure_local_file(&tokenizer_target, &cfg.resolved_tokenizer_url())
        .await
        .map_err(|err| match err {
            SemanticError::Download(msg) => SemanticError::TokenizerMissing(format!(
                "{} ({msg})",
                tokenizer_target.display()
            )),
            other => other,
        })?;

    Ok(ModelAssets {
        model_path,
        tokenizer_path,
    })
}

/// Returns `target` if it already exists, otherwise downloads `remote_url` into it.
async fn ensure_local_file(target: &Path, remote_url: &str) -> Result<PathBuf, SemanticError> {
    if target.exists() {
        return Ok(target.to_path_buf());
    }

    info!(url = remote_url, target = %target.display(), "downloading model asset");
    fetch::download_to_path(target, remote_url).await?;
    Ok(target.to_path_buf())
}
