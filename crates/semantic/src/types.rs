use serde::{Deserialize, Serialize};

use crate::config::EmbeddingMode;

/// Identity of a loaded embedding model.
///
/// `name` and `dimension` are stamped on persisted indexes so that vectors
/// from different embedding spaces never end up searched together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    /// Length of every vector the model returns.
    pub dimension: usize,
    pub mode: EmbeddingMode,
    /// Whether vectors are L2-normalized.
    pub normalized: bool,
}
