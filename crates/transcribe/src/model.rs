//! Speech model seam and model file acquisition.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog;
use crate::types::{RawTranscript, TranscriptionError};

/// A loaded speech recognition model.
///
/// Implementations are loaded once and shared read-only across requests, so
/// `transcribe` takes `&self` and must be safe to call from several blocking
/// threads at once.
pub trait SpeechModel: Send + Sync {
    /// Name the model was loaded under (e.g. `"medium"`).
    fn name(&self) -> &str;

    /// Transcribe 16kHz mono samples. `language` forces the spoken language;
    /// `None` asks the model to detect it.
    fn transcribe(
        &self,
        samples: &[f32],
        language: Option<&str>,
    ) -> Result<RawTranscript, TranscriptionError>;
}

/// Path the weights for `model_name` are stored under inside `model_dir`.
pub fn weights_path(model_dir: &Path, model_name: &str) -> PathBuf {
    model_dir.join(catalog::weights_file_name(model_name))
}

/// Make sure the weights for `model_name` exist under `model_dir`, downloading them
/// from the upstream repository when missing. Returns the local path.
pub async fn ensure_weights(model_dir: &Path, model_name: &str) -> Result<PathBuf, TranscriptionError> {
    let target = weights_path(model_dir, model_name);
    if target.exists() {
        return Ok(target);
    }

    let url = catalog::weights_url(model_name);
    info!(model = model_name, %url, target = %target.display(), "downloading speech model");
    fetch::download_to_path(&target, &url).await?;
    info!(model = model_name, "speech model downloaded");
    Ok(target)
}
