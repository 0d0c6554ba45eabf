//! Workspace umbrella crate for voxindex.
//!
//! Re-exports the building blocks of the two services so callers can embed
//! them behind one dependency:
//!
//! - [`transcribe`]: audio file to timed transcript segments
//! - [`semantic`]: text to sentence embeddings
//! - [`index`]: flat L2 vector index with a persisted metadata sidecar
//! - [`server`]: the HTTP services themselves
//!
//! The usual flow is transcribe, embed the segments, index them, then search.

pub use ::index;
pub use ::semantic;
pub use ::server;
pub use ::transcribe;

pub use ::index::{
    EmbeddingRecord, FlatIndex, Identifier, IndexEntry, IndexError, IndexPaths, IndexStore,
    IndexStoreConfig, SearchHit,
};
pub use ::semantic::{EmbeddingMode, ModelInfo, SemanticConfig, SemanticError, SemanticModel};
pub use ::server::{EmbeddingConfig, ServerError, TranscriptionConfig};
pub use ::transcribe::{
    SpeechModel, Transcript, TranscriptSegment, TranscriptionError, transcribe_file,
};
