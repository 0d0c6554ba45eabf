use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// One timed span of recognized speech, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    /// Start time in seconds, rounded to two decimals.
    pub start: f64,
    /// End time in seconds, rounded to two decimals.
    pub end: f64,
    /// Trimmed segment text.
    pub text: String,
    /// Sign-inverted average token log-probability, rounded to three decimals.
    pub confidence: Option<f64>,
}

/// Shaped result of transcribing one audio file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    /// Detected or forced language code, `"unknown"` when neither is known.
    pub language: String,
    /// End time of the last segment, zero when there are no segments.
    pub duration: f64,
}

/// Segment exactly as a speech backend reports it, before shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Mean log-probability of the segment's text tokens, when the backend exposes it.
    pub avg_logprob: Option<f64>,
}

/// Backend output for a whole file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTranscript {
    pub segments: Vec<RawSegment>,
    pub language: Option<String>,
}

/// Errors surfaced by the transcription pipeline.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The requested audio file does not exist.
    #[error("Audio file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Model files missing, failed to download, or no backend compiled in.
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// Speech model session creation or inference failure.
    #[error("inference error: {0}")]
    Inference(String),

    /// Unsupported container/codec or corrupt audio data.
    #[error("audio decode error: {0}")]
    AudioDecode(String),

    #[error("resample error: {0}")]
    Resample(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<fetch::FetchError> for TranscriptionError {
    fn from(err: fetch::FetchError) -> Self {
        match err {
            fetch::FetchError::Io(err) => TranscriptionError::Io(err),
            other => TranscriptionError::ModelNotAvailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_path() {
        let err = TranscriptionError::NotFound(PathBuf::from("/data/missing.wav"));
        assert_eq!(err.to_string(), "Audio file not found: /data/missing.wav");
    }

    #[test]
    fn failed_download_means_model_not_available() {
        let err = TranscriptionError::from(fetch::FetchError::Http {
            url: "http://host/ggml-tiny.bin".into(),
            message: "unexpected status 404 Not Found".into(),
        });
        assert!(matches!(err, TranscriptionError::ModelNotAvailable(_)));
        assert!(err.to_string().contains("ggml-tiny.bin"));
    }

    #[test]
    fn segment_serializes_absent_confidence_as_null() {
        let segment = TranscriptSegment {
            start: 0.0,
            end: 1.5,
            text: "hello".into(),
            confidence: None,
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert!(json["confidence"].is_null());
        assert_eq!(json["end"], 1.5);
    }
}
