//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: liveness of both services
//! - `transcribe`: audio transcription and the model catalog
//! - `embed`: text to embeddings
//! - `index`: indexing and clearing embeddings
//! - `search`: semantic search over indexed segments

pub mod embed;
pub mod health;
pub mod index;
pub mod search;
pub mod transcribe;

use crate::error::ServerError;

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound("no such route".to_string())
}
