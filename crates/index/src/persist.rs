//! On-disk format of a persisted index.
//!
//! An index is two files written as a pair:
//!
//! - the **vector file**: one codec byte followed by the (optionally zstd
//!   compressed) bincode encoding of the vectors and their header;
//! - the **metadata sidecar**: pretty JSON mapping each
//!   position to its caller identifiers.
//!
//! Both carry the embedding model name, the dimension and a `generation`
//! counter bumped on every save. A pair whose generations differ was torn by a
//! crash between the two writes and is refused at load.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zstd::{decode_all, encode_all};

use crate::flat::FlatIndex;
use crate::identifier::Identifier;
use crate::IndexError;

/// Bump whenever either file layout changes.
pub const FORMAT_VERSION: u16 = 1;

const VECTOR_MAGIC: [u8; 4] = *b"VXIX";

/// Compression codec options for the vector file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// No compression (useful for debugging or when storage is not a concern).
    None,
    /// Zstd compression (default, good balance of speed and ratio).
    #[default]
    Zstd,
}

impl CompressionCodec {
    fn tag(self) -> u8 {
        match self {
            CompressionCodec::None => 0,
            CompressionCodec::Zstd => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, IndexError> {
        match tag {
            0 => Ok(CompressionCodec::None),
            1 => Ok(CompressionCodec::Zstd),
            other => Err(IndexError::Corrupt(format!("unknown codec tag {other}"))),
        }
    }
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd, where higher = better compression but slower).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Tag byte followed by the encoded payload.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        let mut out = vec![self.codec.tag()];
        match self.codec {
            CompressionCodec::None => out.extend_from_slice(data),
            CompressionCodec::Zstd => out.extend(
                encode_all(data, self.level).map_err(|e| IndexError::Compression(e.to_string()))?,
            ),
        }
        Ok(out)
    }

    /// Inverse of [`compress`](Self::compress). The codec comes from the tag,
    /// so files stay readable after the configured codec changes.
    fn decompress(data: &[u8]) -> Result<Vec<u8>, IndexError> {
        let (&tag, payload) = data
            .split_first()
            .ok_or_else(|| IndexError::Corrupt("vector file is empty".into()))?;
        match CompressionCodec::from_tag(tag)? {
            CompressionCodec::None => Ok(payload.to_vec()),
            CompressionCodec::Zstd => {
                decode_all(payload).map_err(|e| IndexError::Compression(e.to_string()))
            }
        }
    }
}

/// Caller identifiers recorded for one indexed vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub transcript_id: Identifier,
    pub video_id: Option<Identifier>,
}

#[derive(Debug, Deserialize)]
struct VectorFile {
    magic: [u8; 4],
    format_version: u16,
    model: String,
    dimension: u64,
    generation: u64,
    vectors: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    format_version: u16,
    model: String,
    dimension: u64,
    generation: u64,
    entries: BTreeMap<u64, IndexEntry>,
}

/// Where the pair lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub vectors: PathBuf,
    pub metadata: PathBuf,
}

impl IndexPaths {
    pub fn new(vectors: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            vectors: vectors.into(),
            metadata: metadata.into(),
        }
    }
}

/// Everything that makes up a persisted index.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub model: String,
    pub generation: u64,
    pub vectors: FlatIndex,
    pub entries: BTreeMap<u64, IndexEntry>,
}

/// Borrowed view of a [`Snapshot`] for saving.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRef<'a> {
    pub model: &'a str,
    pub generation: u64,
    pub vectors: &'a FlatIndex,
    pub entries: &'a BTreeMap<u64, IndexEntry>,
}

impl Snapshot {
    pub fn borrowed(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            model: &self.model,
            generation: self.generation,
            vectors: &self.vectors,
            entries: &self.entries,
        }
    }
}

// Same field order and types as the owned file structs, so bincode and JSON
// decode them back into `VectorFile` / `MetadataFile`.
#[derive(Serialize)]
struct VectorFileRef<'a> {
    magic: [u8; 4],
    format_version: u16,
    model: &'a str,
    dimension: u64,
    generation: u64,
    vectors: &'a [f32],
}

#[derive(Serialize)]
struct MetadataFileRef<'a> {
    format_version: u16,
    model: &'a str,
    dimension: u64,
    generation: u64,
    entries: &'a BTreeMap<u64, IndexEntry>,
}

/// Write both files of the pair, each through a temporary file that is
/// fsynced and renamed over the target.
pub fn save(
    paths: &IndexPaths,
    compression: &CompressionConfig,
    snapshot: SnapshotRef<'_>,
) -> Result<(), IndexError> {
    let dimension = snapshot.vectors.dimension() as u64;

    let vector_file = VectorFileRef {
        magic: VECTOR_MAGIC,
        format_version: FORMAT_VERSION,
        model: snapshot.model,
        dimension,
        generation: snapshot.generation,
        vectors: snapshot.vectors.as_flat(),
    };
    let encoded = encode_to_vec(&vector_file, standard())
        .map_err(|e| IndexError::Encode(e.to_string()))?;
    let vector_bytes = compression.compress(&encoded)?;

    let metadata_file = MetadataFileRef {
        format_version: FORMAT_VERSION,
        model: snapshot.model,
        dimension,
        generation: snapshot.generation,
        entries: snapshot.entries,
    };
    let metadata_bytes = serde_json::to_vec_pretty(&metadata_file)?;

    write_atomic(&paths.vectors, &vector_bytes)?;
    write_atomic(&paths.metadata, &metadata_bytes)?;

    debug!(
        vectors = snapshot.vectors.len(),
        generation = snapshot.generation,
        bytes = vector_bytes.len(),
        "index persisted"
    );
    Ok(())
}

/// Load a persisted pair for `model` / `dimension`.
///
/// Returns `Ok(None)` when no vector file exists. A vector file without its
/// sidecar, a torn pair, or a pair written for another model or dimension is
/// an error.
pub fn load(
    paths: &IndexPaths,
    model: &str,
    dimension: usize,
) -> Result<Option<Snapshot>, IndexError> {
    if !paths.vectors.exists() {
        if paths.metadata.exists() {
            warn!(
                metadata = %paths.metadata.display(),
                "metadata sidecar found without a vector file; starting empty and overwriting it on next save"
            );
        }
        return Ok(None);
    }
    if !paths.metadata.exists() {
        return Err(IndexError::MissingSidecar(paths.metadata.clone()));
    }

    let raw = fs::read(&paths.vectors)?;
    let decoded = CompressionConfig::decompress(&raw)?;
    let (vector_file, _): (VectorFile, usize) = decode_from_slice(&decoded, standard())
        .map_err(|e| IndexError::Decode(e.to_string()))?;
    if vector_file.magic != VECTOR_MAGIC {
        return Err(IndexError::Corrupt(format!(
            "{} is not a vector index file",
            paths.vectors.display()
        )));
    }

    let metadata_file: MetadataFile = serde_json::from_slice(&fs::read(&paths.metadata)?)?;

    for version in [vector_file.format_version, metadata_file.format_version] {
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }
    }

    check_identity(&vector_file.model, vector_file.dimension, model, dimension)?;
    check_identity(&metadata_file.model, metadata_file.dimension, model, dimension)?;

    if vector_file.generation != metadata_file.generation {
        return Err(IndexError::Inconsistent(format!(
            "vector file generation {} does not match metadata generation {}",
            vector_file.generation, metadata_file.generation
        )));
    }

    let vectors = FlatIndex::from_flat(dimension, vector_file.vectors)?;
    if metadata_file.entries.len() != vectors.len() {
        return Err(IndexError::Inconsistent(format!(
            "{} vectors but {} metadata entries",
            vectors.len(),
            metadata_file.entries.len()
        )));
    }

    info!(
        vectors = vectors.len(),
        generation = vector_file.generation,
        path = %paths.vectors.display(),
        "loaded persisted index"
    );

    Ok(Some(Snapshot {
        model: vector_file.model,
        generation: vector_file.generation,
        vectors,
        entries: metadata_file.entries,
    }))
}

fn check_identity(
    found_model: &str,
    found_dimension: u64,
    model: &str,
    dimension: usize,
) -> Result<(), IndexError> {
    if found_model != model || found_dimension != dimension as u64 {
        return Err(IndexError::IdentityMismatch {
            expected: format!("{model}/{dimension}"),
            found: format!("{found_model}/{found_dimension}"),
        });
    }
    Ok(())
}

/// Replace `path` with `bytes` so that readers see either the old or the new
/// content, never a partial write.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

    #[cfg(unix)]
    fs::File::open(&dir)?.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(dir: &Path) -> IndexPaths {
        IndexPaths::new(dir.join("index.bin"), dir.join("metadata.json"))
    }

    fn snapshot(generation: u64) -> Snapshot {
        let mut vectors = FlatIndex::new(3);
        vectors
            .add_batch(&[vec![1.0f32, 0.0, 0.0], vec![0.0, 1.0, 0.0]])
            .unwrap();
        let mut entries = BTreeMap::new();
        entries.insert(
            0,
            IndexEntry {
                transcript_id: Identifier::Int(1),
                video_id: Some(Identifier::Int(7)),
            },
        );
        entries.insert(
            1,
            IndexEntry {
                transcript_id: Identifier::from("seg-2"),
                video_id: None,
            },
        );
        Snapshot {
            model: "mini".into(),
            generation,
            vectors,
            entries,
        }
    }

    #[test]
    fn save_then_load_restores_pair() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let original = snapshot(4);

        save(&paths, &CompressionConfig::default(), original.borrowed()).unwrap();
        let loaded = load(&paths, "mini", 3).unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn uncompressed_files_load_under_any_config() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let cfg = CompressionConfig::default().with_codec(CompressionCodec::None);

        save(&paths, &cfg, snapshot(1).borrowed()).unwrap();
        assert_eq!(fs::read(&paths.vectors).unwrap()[0], 0);
        assert!(load(&paths, "mini", 3).unwrap().is_some());
    }

    #[test]
    fn sidecar_is_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save(&paths, &CompressionConfig::default(), snapshot(2).borrowed()).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(&paths.metadata).unwrap()).unwrap();
        assert_eq!(json["generation"], 2);
        assert_eq!(json["model"], "mini");
        assert_eq!(json["entries"]["0"]["transcript_id"], 1);
        assert_eq!(json["entries"]["0"]["video_id"], 7);
        assert!(json["entries"]["1"]["video_id"].is_null());
    }

    #[test]
    fn missing_files_mean_no_index() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&paths_in(dir.path()), "mini", 3).unwrap().is_none());
    }

    #[test]
    fn stray_sidecar_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        fs::write(&paths.metadata, b"{}").unwrap();
        assert!(load(&paths, "mini", 3).unwrap().is_none());
    }

    #[test]
    fn vector_file_without_sidecar_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save(&paths, &CompressionConfig::default(), snapshot(1).borrowed()).unwrap();
        fs::remove_file(&paths.metadata).unwrap();

        assert!(matches!(
            load(&paths, "mini", 3),
            Err(IndexError::MissingSidecar(_))
        ));
    }

    #[test]
    fn torn_pair_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save(&paths, &CompressionConfig::default(), snapshot(1).borrowed()).unwrap();
        let old_sidecar = fs::read(&paths.metadata).unwrap();
        save(&paths, &CompressionConfig::default(), snapshot(2).borrowed()).unwrap();
        // simulate a crash after the vector file was replaced
        fs::write(&paths.metadata, old_sidecar).unwrap();

        assert!(matches!(
            load(&paths, "mini", 3),
            Err(IndexError::Inconsistent(_))
        ));
    }

    #[test]
    fn other_model_or_dimension_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save(&paths, &CompressionConfig::default(), snapshot(1).borrowed()).unwrap();

        assert!(matches!(
            load(&paths, "other-model", 3),
            Err(IndexError::IdentityMismatch { .. })
        ));
        assert!(matches!(
            load(&paths, "mini", 384),
            Err(IndexError::IdentityMismatch { .. })
        ));
    }

    #[test]
    fn garbage_vector_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save(&paths, &CompressionConfig::default(), snapshot(1).borrowed()).unwrap();
        fs::write(&paths.vectors, [9u8, 1, 2, 3]).unwrap();

        assert!(matches!(
            load(&paths, "mini", 3),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save(&paths, &CompressionConfig::default(), snapshot(1).borrowed()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("idx");
        let paths = paths_in(&nested);
        save(&paths, &CompressionConfig::default(), snapshot(1).borrowed()).unwrap();
        assert!(paths.vectors.exists());
        assert!(paths.metadata.exists());
    }
}
