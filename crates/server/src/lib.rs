//! voxindex server - HTTP services for transcription and semantic search
//!
//! This crate hosts two independent services built on axum:
//!
//! - **Transcription service**: transcribes audio files on the server's
//!   filesystem into timed text segments with a speech model that is loaded
//!   once, in the background, at startup.
//! - **Embedding & search service**: embeds text segments, keeps them in a
//!   flat L2 vector index with a metadata sidecar persisted after every
//!   mutation, and answers semantic search queries.
//!
//! Both share the same plumbing: configuration from an optional file plus
//! environment variables, JSON structured logging, request IDs, CORS and
//! `{"error": {"code", "message"}}` error bodies.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::EmbeddingConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EmbeddingConfig::load()?;
//!     server::start_embedding_server(config).await
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Transcription service (default port 5000)
//!
//! - `GET /health` - status, model name, whether the model is loaded
//! - `POST /transcribe` - `{audio_path, language?}` to segments
//! - `GET /models` - speech model catalog
//!
//! ## Embedding & search service (default port 5001)
//!
//! - `GET /health` - status, model name, index size
//! - `POST /embed` - `{segments: [{id, text}]}` to embeddings
//! - `POST /index` - `{video_id?, embeddings: [{id, embedding}]}`
//! - `POST /search` - `{query, video_id?, top_k?}`
//! - `POST /clear` - empty the index

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use crate::config::{EmbeddingConfig, TranscriptionConfig};
pub use crate::error::{JsonBody, ServerError, ServerResult};
pub use crate::server::{
    embedding_router, init_tracing, start_embedding_server, start_transcription_server,
    transcription_router,
};
pub use crate::state::{EmbeddingState, ModelLoader, TranscriptionState};
