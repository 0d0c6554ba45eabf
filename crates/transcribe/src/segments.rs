//! Reshapes raw backend output into the response segments.

use crate::types::{RawTranscript, Transcript, TranscriptSegment};

/// Language reported when the backend detects none and the caller forced none.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Convert an average log-probability into the reported confidence score.
pub fn confidence_from_logprob(avg_logprob: f64) -> f64 {
    // -0.0 would serialize as "-0.0"
    let score = round_to(-avg_logprob, 3);
    if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Shape a raw transcript: rounded times, trimmed text, confidence, language and duration.
///
/// Segments keep the backend's order. `forced_language` is the caller's hint and is
/// reported when the backend did not report a language of its own.
pub fn shape_transcript(raw: RawTranscript, forced_language: Option<&str>) -> Transcript {
    let segments: Vec<TranscriptSegment> = raw
        .segments
        .into_iter()
        .map(|seg| TranscriptSegment {
            start: round_to(seg.start, 2),
            end: round_to(seg.end, 2),
            text: seg.text.trim().to_string(),
            confidence: seg.avg_logprob.map(confidence_from_logprob),
        })
        .collect();

    let duration = segments.last().map_or(0.0, |seg| seg.end);
    let language = raw
        .language
        .filter(|lang| !lang.is_empty())
        .or_else(|| forced_language.map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

    Transcript {
        segments,
        language,
        duration,
    }
}
