//! # Segment Index
//!
//! Exact nearest-neighbor search over transcript segment embeddings, with the
//! caller's identifiers kept alongside and everything persisted to disk.
//!
//! ## Core Features
//!
//! - **Flat L2 index**: [`FlatIndex`] stores fixed-dimension `f32` vectors back
//!   to back and answers k-nearest-neighbor queries by squared Euclidean
//!   distance. Positions are append-only.
//! - **Metadata**: each position maps to a transcript id and an optional video
//!   id ([`IndexEntry`]), used for filtering and for reporting results.
//! - **Persistence**: the vectors go to a binary file (bincode, zstd by
//!   default) and the metadata to a JSON sidecar. Each file is replaced
//!   atomically and both carry a shared generation counter plus the
//!   embedding model identity, checked at load.
//! - **Concurrency**: [`IndexStore`] guards the whole
//!   append / record / persist sequence with one `RwLock`.
//!
//! ## Example Usage
//!
//! ```
//! use index::{EmbeddingRecord, Identifier, IndexPaths, IndexStore, IndexStoreConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = IndexStoreConfig {
//!     paths: IndexPaths::new(dir.path().join("index.bin"), dir.path().join("metadata.json")),
//!     compression: Default::default(),
//! };
//! let store = IndexStore::open(config, "all-MiniLM-L6-v2", 3).unwrap();
//!
//! let records = vec![EmbeddingRecord { id: Identifier::Int(1), embedding: vec![0.1, 0.2, 0.3] }];
//! store.append(&records, Some(Identifier::Int(7))).unwrap();
//!
//! let hits = store.search(&[0.1, 0.2, 0.3], 5, Some(&Identifier::Int(7))).unwrap();
//! assert_eq!(hits[0].transcript_id, Identifier::Int(1));
//! assert_eq!(hits[0].similarity, 1.0);
//! ```

pub mod flat;
pub mod identifier;
pub mod persist;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use crate::flat::{FlatIndex, Neighbor};
pub use crate::identifier::Identifier;
pub use crate::persist::{CompressionCodec, CompressionConfig, IndexEntry, IndexPaths};
pub use crate::store::{EmbeddingRecord, IndexStore, IndexStoreConfig, SearchHit};

/// Custom error type
#[derive(Error, Debug)]
pub enum IndexError {
    /// A vector's length differs from the index dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Persisted files were written for another embedding model or dimension.
    #[error("persisted index belongs to {found}, service uses {expected}")]
    IdentityMismatch { expected: String, found: String },
    #[error("vector file present but metadata sidecar missing: {}", .0.display())]
    MissingSidecar(PathBuf),
    /// The two files of the pair disagree.
    #[error("persisted index is inconsistent: {0}")]
    Inconsistent(String),
    #[error("persisted index is corrupt: {0}")]
    Corrupt(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("metadata json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index lock poisoned")]
    LockPoisoned,
}
