use crate::error::ServerResult;
use crate::state::{EmbeddingState, TranscriptionState};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptionHealth {
    pub status: String,
    pub model: String,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingHealth {
    pub status: String,
    pub model: String,
    pub index_size: usize,
}

/// Health check for the transcription service
///
/// Always 200 while the process is up; `model_loaded` turns true once the
/// speech model has finished loading.
pub async fn transcription_health(State(state): State<TranscriptionState>) -> impl IntoResponse {
    Json(TranscriptionHealth {
        status: "ok".to_string(),
        model: state.config.whisper_model.clone(),
        model_loaded: state.model_loaded(),
    })
}

/// Health check for the embedding service
pub async fn embedding_health(
    State(state): State<EmbeddingState>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(EmbeddingHealth {
        status: "ok".to_string(),
        model: state.model.name().to_string(),
        index_size: state.store.len()?,
    }))
}
