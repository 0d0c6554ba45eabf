use crate::error::{JsonBody, ServerResult};
use crate::state::TranscriptionState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use transcribe::{Transcript, MODEL_OPTIONS};

/// Request to transcribe an audio file already on the server's filesystem
#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub audio_path: PathBuf,

    /// Language code to force; detected when absent
    #[serde(default)]
    pub language: Option<String>,
}

/// Speech model catalog
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub available: Vec<String>,
    pub current: String,
    pub description: BTreeMap<String, String>,
}

/// Transcribe an audio file
///
/// Waits for the speech model if it is still loading. Decoding and
/// inference run on the blocking pool.
pub async fn transcribe_audio(
    State(state): State<TranscriptionState>,
    JsonBody(request): JsonBody<TranscribeRequest>,
) -> ServerResult<Json<Transcript>> {
    if !request.audio_path.is_file() {
        return Err(transcribe::TranscriptionError::NotFound(request.audio_path).into());
    }

    let model = state.model().await?;
    let transcript = tokio::task::spawn_blocking(move || {
        transcribe::transcribe_file(
            model.as_ref(),
            &request.audio_path,
            request.language.as_deref(),
        )
    })
    .await??;

    Ok(Json(transcript))
}

/// List available speech model sizes
pub async fn list_models(State(state): State<TranscriptionState>) -> impl IntoResponse {
    Json(ModelsResponse {
        available: MODEL_OPTIONS.iter().map(|m| m.name.to_string()).collect(),
        current: state.config.whisper_model.clone(),
        description: MODEL_OPTIONS
            .iter()
            .map(|m| (m.name.to_string(), m.description.to_string()))
            .collect(),
    })
}
