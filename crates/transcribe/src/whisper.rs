//! whisper.cpp backend.
//!
//! whisper-rs reports segment times in centiseconds and token probabilities as
//! natural-log values; both are converted here so the rest of the crate only
//! sees seconds and mean log-probabilities.

use std::path::Path;

use tracing::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use crate::model::SpeechModel;
use crate::types::{RawSegment, RawTranscript, TranscriptionError};

/// Language value whisper.cpp interprets as "detect".
const AUTO_LANGUAGE: &str = "auto";

/// A loaded ggml Whisper model.
///
/// The context holds the weights and is shared; every call gets its own
/// decoding state, so concurrent transcriptions do not serialize on a lock.
pub struct WhisperModel {
    name: String,
    ctx: WhisperContext,
    threads: i32,
}

impl WhisperModel {
    /// Load ggml weights from `weights`. CPU and memory heavy; call from a blocking thread.
    pub fn load(name: &str, weights: &Path, threads: usize) -> Result<Self, TranscriptionError> {
        info!(model = name, path = %weights.display(), "loading whisper model");
        let path = weights.to_str().ok_or_else(|| {
            TranscriptionError::ModelNotAvailable(format!(
                "model path is not valid UTF-8: {}",
                weights.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| TranscriptionError::ModelNotAvailable(format!("load {path}: {e}")))?;

        info!(model = name, "whisper model loaded");
        Ok(Self {
            name: name.to_string(),
            ctx,
            threads: i32::try_from(threads.max(1)).unwrap_or(i32::MAX),
        })
    }

    fn collect_segments(&self, state: &WhisperState) -> Result<Vec<RawSegment>, TranscriptionError> {
        let eot = self.ctx.token_eot();
        let n_segments = state.full_n_segments().map_err(inference)?;
        let mut segments = Vec::with_capacity(usize::try_from(n_segments).unwrap_or(0));

        for i in 0..n_segments {
            let text = state.full_get_segment_text(i).map_err(inference)?;
            let t0 = state.full_get_segment_t0(i).map_err(inference)?;
            let t1 = state.full_get_segment_t1(i).map_err(inference)?;

            let n_tokens = state.full_n_tokens(i).map_err(inference)?;
            let mut logprob_sum = 0.0f64;
            let mut counted = 0u32;
            for j in 0..n_tokens {
                let token = state.full_get_token_data(i, j).map_err(inference)?;
                // timestamps and other specials sit at or above end-of-text
                if token.id >= eot {
                    continue;
                }
                logprob_sum += f64::from(token.plog);
                counted += 1;
            }

            segments.push(RawSegment {
                start: t0 as f64 / 100.0,
                end: t1 as f64 / 100.0,
                text,
                avg_logprob: (counted > 0).then(|| logprob_sum / f64::from(counted)),
            });
        }

        Ok(segments)
    }
}

impl SpeechModel for WhisperModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn transcribe(
        &self,
        samples: &[f32],
        language: Option<&str>,
    ) -> Result<RawTranscript, TranscriptionError> {
        let mut state = self.ctx.create_state().map_err(inference)?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.threads);
        params.set_language(Some(language.unwrap_or(AUTO_LANGUAGE)));
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state.full(params, samples).map_err(inference)?;

        let segments = self.collect_segments(&state)?;
        let detected = state
            .full_lang_id_from_state()
            .ok()
            .and_then(whisper_rs::get_lang_str)
            .map(str::to_string);

        debug!(
            segments = segments.len(),
            language = detected.as_deref().unwrap_or("-"),
            "whisper inference finished"
        );

        Ok(RawTranscript {
            segments,
            language: detected,
        })
    }
}

fn inference(err: whisper_rs::WhisperError) -> TranscriptionError {
    TranscriptionError::Inference(err.to_string())
}
