use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::flat::FlatIndex;
use crate::identifier::Identifier;
use crate::persist::{self, CompressionConfig, IndexEntry, IndexPaths, SnapshotRef};
use crate::IndexError;

/// Filtered searches look at this many candidates per requested result.
pub const FILTER_OVERSAMPLE: usize = 10;

/// An embedding tagged with its caller identifier, as indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: Identifier,
    pub embedding: Vec<f32>,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub transcript_id: Identifier,
    pub video_id: Option<Identifier>,
    /// `1 / (1 + squared distance)`, rounded to four decimals.
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct IndexStoreConfig {
    pub paths: IndexPaths,
    pub compression: CompressionConfig,
}

struct Inner {
    vectors: FlatIndex,
    entries: BTreeMap<u64, IndexEntry>,
    generation: u64,
}

/// The vector index, its metadata and their persisted pair, behind one lock.
///
/// Mutations (append or clear, then persist) hold the write lock for the
/// whole sequence, so a search never sees a half-applied batch. The model
/// name and dimension are fixed at open and stamped on every save.
pub struct IndexStore {
    model: String,
    dimension: usize,
    config: IndexStoreConfig,
    inner: RwLock<Inner>,
}

impl IndexStore {
    /// Load the persisted pair, or start empty when none exists.
    pub fn open(
        config: IndexStoreConfig,
        model: &str,
        dimension: usize,
    ) -> Result<Self, IndexError> {
        let inner = match persist::load(&config.paths, model, dimension)? {
            Some(snapshot) => Inner {
                vectors: snapshot.vectors,
                entries: snapshot.entries,
                generation: snapshot.generation,
            },
            None => {
                info!(model, dimension, "starting with an empty index");
                Inner {
                    vectors: FlatIndex::new(dimension),
                    entries: BTreeMap::new(),
                    generation: 0,
                }
            }
        };

        Ok(Self {
            model: model.to_string(),
            dimension,
            config,
            inner: RwLock::new(inner),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.read()?.vectors.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.read()?.vectors.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, IndexError> {
        self.inner.read().map_err(|_| IndexError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, IndexError> {
        self.inner.write().map_err(|_| IndexError::LockPoisoned)
    }

    fn persist(&self, inner: &Inner) -> Result<(), IndexError> {
        let snapshot = SnapshotRef {
            model: &self.model,
            generation: inner.generation,
            vectors: &inner.vectors,
            entries: &inner.entries,
        };
        persist::save(&self.config.paths, &self.config.compression, snapshot)
    }

    /// Append `records` in order, tag each with `video_id`, and persist.
    ///
    /// All vectors must have the index dimension; otherwise nothing is
    /// appended. If persisting fails the in-memory state is rolled back.
    /// Returns the total number of vectors afterwards.
    pub fn append(
        &self,
        records: &[EmbeddingRecord],
        video_id: Option<Identifier>,
    ) -> Result<usize, IndexError> {
        let mut inner = self.write()?;
        if records.is_empty() {
            return Ok(inner.vectors.len());
        }

        let embeddings: Vec<&[f32]> = records.iter().map(|r| r.embedding.as_slice()).collect();
        let first = inner.vectors.add_batch(&embeddings)?;
        let previous_generation = inner.generation;

        for (offset, record) in records.iter().enumerate() {
            inner.entries.insert(
                (first + offset) as u64,
                IndexEntry {
                    transcript_id: record.id.clone(),
                    video_id: video_id.clone(),
                },
            );
        }
        inner.generation += 1;

        if let Err(err) = self.persist(&inner) {
            inner.vectors.truncate(first);
            let stale = inner.entries.split_off(&(first as u64));
            debug!(dropped = stale.len(), "rolled back unpersisted append");
            inner.generation = previous_generation;
            return Err(err);
        }

        let total = inner.vectors.len();
        info!(added = records.len(), total, "indexed embeddings");
        Ok(total)
    }

    /// The `top_k` closest entries to `query`, optionally restricted to one video.
    ///
    /// With a filter, `top_k * 10` candidates are examined before filtering,
    /// so fewer than `top_k` results can come back even when more matching
    /// entries exist further away. A blank filter (`0` or `""`) is the same
    /// as no filter.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        video_id: Option<&Identifier>,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let video_id = video_id.filter(|id| !id.is_blank());
        let inner = self.read()?;
        let total = inner.vectors.len();
        if total == 0 || top_k == 0 {
            return Ok(Vec::new());
        }

        let breadth = match video_id {
            Some(_) => top_k.saturating_mul(FILTER_OVERSAMPLE).min(total),
            None => top_k.min(total),
        };
        debug!(top_k, breadth, total, filtered = video_id.is_some(), "searching index");

        let hits = inner
            .vectors
            .search(query, breadth)?
            .into_iter()
            .filter_map(|neighbor| {
                let entry = inner.entries.get(&(neighbor.position as u64))?;
                if let Some(wanted) = video_id {
                    if entry.video_id.as_ref() != Some(wanted) {
                        return None;
                    }
                }
                Some(SearchHit {
                    transcript_id: entry.transcript_id.clone(),
                    video_id: entry.video_id.clone(),
                    similarity: similarity(neighbor.distance),
                })
            })
            .take(top_k)
            .collect();

        Ok(hits)
    }

    /// Drop every vector and entry and persist the empty pair. Positions
    /// start again from zero afterwards.
    pub fn clear(&self) -> Result<(), IndexError> {
        let mut inner = self.write()?;
        let previous = std::mem::replace(
            &mut *inner,
            Inner {
                vectors: FlatIndex::new(self.dimension),
                entries: BTreeMap::new(),
                generation: 0,
            },
        );
        inner.generation = previous.generation + 1;

        if let Err(err) = self.persist(&inner) {
            *inner = previous;
            return Err(err);
        }
        info!(dropped = previous.vectors.len(), "index cleared");
        Ok(())
    }
}

/// Map a squared distance into `(0, 1]`, rounded to four decimals.
pub fn similarity(distance: f32) -> f64 {
    let score = 1.0 / (1.0 + f64::from(distance.max(0.0)));
    (score * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config_in(dir: &Path) -> IndexStoreConfig {
        IndexStoreConfig {
            paths: IndexPaths::new(dir.join("index.bin"), dir.join("metadata.json")),
            compression: CompressionConfig::default(),
        }
    }

    fn record(id: impl Into<Identifier>, embedding: &[f32]) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.into(),
            embedding: embedding.to_vec(),
        }
    }

    #[test]
    fn append_then_exact_match_scores_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 2).unwrap();

        let total = store
            .append(&[record(1i64, &[0.5, 0.5])], Some(Identifier::Int(7)))
            .unwrap();
        assert_eq!(total, 1);

        let hits = store
            .search(&[0.5, 0.5], 1, Some(&Identifier::Int(7)))
            .unwrap();
        assert_eq!(
            hits,
            vec![SearchHit {
                transcript_id: Identifier::Int(1),
                video_id: Some(Identifier::Int(7)),
                similarity: 1.0,
            }]
        );
    }

    #[test]
    fn similarity_decreases_with_distance() {
        assert_eq!(similarity(0.0), 1.0);
        assert_eq!(similarity(1.0), 0.5);
        assert_eq!(similarity(3.0), 0.25);
        assert!(similarity(10.0) < similarity(9.0));
        assert!(similarity(1e30) >= 0.0);
    }

    #[test]
    fn filter_restricts_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 1).unwrap();
        store
            .append(&[record(1i64, &[0.0]), record(2i64, &[1.0])], Some(Identifier::Int(1)))
            .unwrap();
        store
            .append(&[record(3i64, &[0.1]), record(4i64, &[0.2])], Some(Identifier::Int(2)))
            .unwrap();
        store.append(&[record(5i64, &[0.05])], None).unwrap();

        let hits = store.search(&[0.0], 1, Some(&Identifier::Int(2))).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].transcript_id, Identifier::Int(3));

        let unfiltered = store.search(&[0.0], 3, None).unwrap();
        let ids: Vec<_> = unfiltered.iter().map(|h| h.transcript_id.clone()).collect();
        assert_eq!(
            ids,
            vec![Identifier::Int(1), Identifier::Int(5), Identifier::Int(3)]
        );
        assert!(unfiltered[2].similarity < unfiltered[0].similarity);
    }

    #[test]
    fn filter_breadth_can_underfill() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 1).unwrap();
        let near: Vec<EmbeddingRecord> = (0..20i64).map(|i| record(i, &[0.0])).collect();
        store.append(&near, Some(Identifier::from("a"))).unwrap();
        store
            .append(&[record(100i64, &[50.0])], Some(Identifier::from("b")))
            .unwrap();

        // top_k 1 examines 10 candidates, all from video "a"
        let hits = store.search(&[0.0], 1, Some(&Identifier::from("b"))).unwrap();
        assert!(hits.is_empty());

        // top_k 3 examines all 21
        let hits = store.search(&[0.0], 3, Some(&Identifier::from("b"))).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].transcript_id, Identifier::Int(100));
    }

    #[test]
    fn filter_value_kind_matters() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 1).unwrap();
        store.append(&[record(1i64, &[0.0])], Some(Identifier::Int(7))).unwrap();

        assert!(store
            .search(&[0.0], 1, Some(&Identifier::from("7")))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn blank_video_filter_matches_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 1).unwrap();
        store.append(&[record(1i64, &[0.0])], Some(Identifier::Int(5))).unwrap();
        store.append(&[record(2i64, &[3.0])], None).unwrap();

        for blank in [Identifier::Int(0), Identifier::from("")] {
            let hits = store.search(&[0.0], 2, Some(&blank)).unwrap();
            let ids: Vec<_> = hits.iter().map(|h| h.transcript_id.clone()).collect();
            assert_eq!(ids, vec![Identifier::Int(1), Identifier::Int(2)], "filter {blank:?}");
        }
    }

    #[test]
    fn wrong_dimension_is_rejected_and_nothing_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 2).unwrap();
        store.append(&[record(1i64, &[0.0, 0.0])], None).unwrap();

        let err = store
            .append(&[record(2i64, &[1.0, 1.0]), record(3i64, &[1.0])], None)
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn empty_append_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 2).unwrap();
        assert_eq!(store.append(&[], None).unwrap(), 0);
        assert!(!dir.path().join("index.bin").exists());
    }

    #[test]
    fn reopen_restores_vectors_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = IndexStore::open(config_in(dir.path()), "m", 2).unwrap();
            store
                .append(
                    &[record("a", &[0.0, 1.0]), record("b", &[1.0, 0.0])],
                    Some(Identifier::from("vid")),
                )
                .unwrap();
            store.append(&[record("c", &[1.0, 1.0])], None).unwrap();
        }

        let store = IndexStore::open(config_in(dir.path()), "m", 2).unwrap();
        assert_eq!(store.len().unwrap(), 3);
        let hits = store.search(&[1.0, 0.0], 1, None).unwrap();
        assert_eq!(hits[0].transcript_id, Identifier::from("b"));
        assert_eq!(hits[0].video_id, Some(Identifier::from("vid")));
    }

    #[test]
    fn clear_empties_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(config_in(dir.path()), "m", 2).unwrap();
        store.append(&[record(1i64, &[0.0, 0.0])], None).unwrap();
        store.clear().unwrap();

        assert!(store.is_empty().unwrap());
        assert!(store.search(&[0.0, 0.0], 5, None).unwrap().is_empty());

        let reopened = IndexStore::open(config_in(dir.path()), "m", 2).unwrap();
        assert_eq!(reopened.len().unwrap(), 0);

        // positions restart after a clear
        reopened.append(&[record(9i64, &[0.0, 0.0])], None).unwrap();
        let hits = reopened.search(&[0.0, 0.0], 1, None).unwrap();
        assert_eq!(hits[0].transcript_id, Identifier::Int(9));
    }

    #[test]
    fn failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // the vector file's parent is a regular file, so every save fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let config = IndexStoreConfig {
            paths: IndexPaths::new(blocker.join("index.bin"), dir.path().join("metadata.json")),
            compression: CompressionConfig::default(),
        };
        let store = IndexStore::open(config, "m", 1).unwrap();

        assert!(store.append(&[record(1i64, &[0.0])], None).is_err());
        assert_eq!(store.len().unwrap(), 0);
        assert!(store.search(&[0.0], 1, None).unwrap().is_empty());
    }

    #[test]
    fn concurrent_readers_see_whole_batches() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(IndexStore::open(config_in(dir.path()), "m", 1).unwrap());

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for batch in 0..10i64 {
                    let records: Vec<_> = (0..5).map(|i| record(batch * 5 + i, &[0.0])).collect();
                    store.append(&records, None).unwrap();
                }
            })
        };

        for _ in 0..50 {
            assert_eq!(store.len().unwrap() % 5, 0);
        }
        writer.join().unwrap();
        assert_eq!(store.len().unwrap(), 50);
    }
}
