use crate::error::{JsonBody, ServerResult};
use crate::state::EmbeddingState;
use axum::extract::State;
use axum::Json;
use index::{EmbeddingRecord, Identifier};
use serde::{Deserialize, Serialize};

/// One text segment to embed
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub id: Identifier,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<EmbeddingRecord>,
}

/// Generate embeddings for text segments
///
/// One embedding per segment, in input order, carrying the segment's id.
pub async fn embed_segments(
    State(state): State<EmbeddingState>,
    JsonBody(request): JsonBody<EmbedRequest>,
) -> ServerResult<Json<EmbedResponse>> {
    if request.segments.is_empty() {
        return Ok(Json(EmbedResponse {
            embeddings: Vec::new(),
        }));
    }

    tracing::info!(segments = request.segments.len(), "generating embeddings");

    let model = state.model.clone();
    let segments = request.segments;
    let embeddings = tokio::task::spawn_blocking(move || {
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let vectors = model.embed_batch(&texts)?;
        Ok::<_, semantic::SemanticError>(
            segments
                .into_iter()
                .zip(vectors)
                .map(|(segment, embedding)| EmbeddingRecord {
                    id: segment.id,
                    embedding,
                })
                .collect::<Vec<_>>(),
        )
    })
    .await??;

    Ok(Json(EmbedResponse { embeddings }))
}
