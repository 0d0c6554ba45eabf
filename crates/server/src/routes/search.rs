use crate::error::{JsonBody, ServerError, ServerResult};
use crate::state::EmbeddingState;
use axum::extract::State;
use axum::Json;
use index::{Identifier, SearchHit};
use serde::{Deserialize, Serialize};

/// Semantic search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    /// Only return segments indexed under this video
    #[serde(default)]
    pub video_id: Option<Identifier>,

    /// Number of results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

fn default_top_k() -> usize {
    10
}

/// Semantic search over indexed segments
///
/// An empty index answers immediately without touching the model.
pub async fn search_segments(
    State(state): State<EmbeddingState>,
    JsonBody(request): JsonBody<SearchRequest>,
) -> ServerResult<Json<SearchResponse>> {
    if request.top_k == 0 {
        return Err(ServerError::BadRequest(
            "top_k must be a positive integer".to_string(),
        ));
    }

    if state.store.is_empty()? {
        return Ok(Json(SearchResponse {
            results: Vec::new(),
        }));
    }

    let model = state.model.clone();
    let store = state.store.clone();
    let results = tokio::task::spawn_blocking(move || -> ServerResult<Vec<SearchHit>> {
        let query = model.embed(&request.query)?;
        Ok(store.search(&query, request.top_k, request.video_id.as_ref())?)
    })
    .await??;

    Ok(Json(SearchResponse { results }))
}
