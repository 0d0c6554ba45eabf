use crate::error::{JsonBody, ServerResult};
use crate::state::EmbeddingState;
use axum::extract::State;
use axum::Json;
use index::{EmbeddingRecord, Identifier};
use serde::{Deserialize, Serialize};

/// Request to add embeddings to the index
#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    /// Applied to every record of the batch
    #[serde(default)]
    pub video_id: Option<Identifier>,

    pub embeddings: Vec<EmbeddingRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub total_vectors: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Add embeddings to the index and persist it
pub async fn index_embeddings(
    State(state): State<EmbeddingState>,
    JsonBody(request): JsonBody<IndexRequest>,
) -> ServerResult<Json<IndexResponse>> {
    if request.embeddings.is_empty() {
        return Ok(Json(IndexResponse {
            message: "No embeddings to index".to_string(),
            total_vectors: state.store.len()?,
        }));
    }

    let count = request.embeddings.len();
    let store = state.store.clone();
    let total_vectors = tokio::task::spawn_blocking(move || {
        store.append(&request.embeddings, request.video_id)
    })
    .await??;

    Ok(Json(IndexResponse {
        message: format!("Indexed {count} vectors"),
        total_vectors,
    }))
}

/// Drop every indexed vector and persist the empty index
pub async fn clear_index(State(state): State<EmbeddingState>) -> ServerResult<Json<MessageResponse>> {
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.clear()).await??;

    Ok(Json(MessageResponse {
        message: "Index cleared".to_string(),
    }))
}
