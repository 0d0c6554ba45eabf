//! Speech transcription
//!
//! Turns an audio file on disk into timed text segments. The pipeline is:
//!
//! 1. check the file exists (a missing file is [`TranscriptionError::NotFound`])
//! 2. decode it to 16kHz mono f32 ([`audio`])
//! 3. run a [`SpeechModel`]
//! 4. shape the raw output ([`segments`]): rounded times, trimmed text,
//!    confidence, language and duration
//!
//! The model itself sits behind the [`SpeechModel`] trait. The whisper.cpp
//! backend is compiled in with the `whisper` feature; without it
//! [`load_model`] reports the model as unavailable.
//!
//! ```no_run
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), transcribe::TranscriptionError> {
//! let model = transcribe::load_model(Path::new("./models"), "base", 4).await?;
//! let transcript = transcribe::transcribe_file(model.as_ref(), Path::new("talk.wav"), None)?;
//! println!("{} segments in {:?}", transcript.segments.len(), transcript.language);
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod catalog;
pub mod model;
pub mod segments;
pub mod types;

#[cfg(feature = "whisper")]
pub mod whisper;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use crate::catalog::{ModelOption, MODEL_OPTIONS};
pub use crate::model::SpeechModel;
pub use crate::segments::shape_transcript;
pub use crate::types::{RawSegment, RawTranscript, Transcript, TranscriptSegment, TranscriptionError};

/// Transcribe the audio file at `path` with `model`.
///
/// Blocking and CPU-bound: run it on a blocking thread.
pub fn transcribe_file(
    model: &dyn SpeechModel,
    path: &Path,
    language: Option<&str>,
) -> Result<Transcript, TranscriptionError> {
    if !path.is_file() {
        return Err(TranscriptionError::NotFound(path.to_path_buf()));
    }

    info!(path = %path.display(), model = model.name(), "transcribing");
    let samples = audio::decode_file(path)?;
    let raw = model.transcribe(&samples, language)?;
    let transcript = shape_transcript(raw, language);
    info!(
        segments = transcript.segments.len(),
        duration = transcript.duration,
        "transcription complete"
    );
    Ok(transcript)
}

/// Fetch (if needed) and load the speech model `name` from `model_dir`.
#[cfg(feature = "whisper")]
pub async fn load_model(
    model_dir: &Path,
    name: &str,
    threads: usize,
) -> Result<Arc<dyn SpeechModel>, TranscriptionError> {
    let weights = model::ensure_weights(model_dir, name).await?;
    let name = name.to_string();
    let loaded = tokio::task::spawn_blocking(move || whisper::WhisperModel::load(&name, &weights, threads))
        .await
        .map_err(|e| TranscriptionError::Inference(format!("model load task: {e}")))??;
    Ok(Arc::new(loaded))
}

/// Fetch (if needed) and load the speech model `name` from `model_dir`.
#[cfg(not(feature = "whisper"))]
pub async fn load_model(
    _model_dir: &Path,
    name: &str,
    _threads: usize,
) -> Result<Arc<dyn SpeechModel>, TranscriptionError> {
    Err(TranscriptionError::ModelNotAvailable(format!(
        "cannot load '{name}': built without the `whisper` feature"
    )))
}
