use std::cmp::Ordering;

use crate::IndexError;

/// One neighbor returned by [`FlatIndex::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the vector in insertion order.
    pub position: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// Exact nearest-neighbor index over fixed-dimension `f32` vectors.
///
/// Vectors are stored back to back in one buffer. Positions are assigned in
/// append order and never change; the only removal is [`reset`](Self::reset)
/// (and [`truncate`](Self::truncate) for rolling back an append).
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Rebuild an index from its flat buffer.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::Corrupt("index dimension is zero".into()));
        }
        if data.len() % dimension != 0 {
            return Err(IndexError::Corrupt(format!(
                "{} values do not divide into vectors of dimension {dimension}",
                data.len()
            )));
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    fn check_dimension(&self, len: usize) -> Result<(), IndexError> {
        if len != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: len,
            });
        }
        Ok(())
    }

    /// Append every vector of `batch` or none of them. Returns the position of the first.
    pub fn add_batch<V: AsRef<[f32]>>(&mut self, batch: &[V]) -> Result<usize, IndexError> {
        for v in batch {
            self.check_dimension(v.as_ref().len())?;
        }
        let first = self.len();
        self.data.reserve(batch.len() * self.dimension);
        for v in batch {
            self.data.extend_from_slice(v.as_ref());
        }
        Ok(first)
    }

    /// Keep only the first `len` vectors.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// The `k` nearest vectors to `query`, closest first. Equal distances keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.check_dimension(query.len())?;
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: squared_l2(query, v),
            })
            .collect();

        let by_distance = |a: &Neighbor, b: &Neighbor| -> Ordering {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        };

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance);
        Ok(scored)
    }
}

#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[[f32; 2]]) -> FlatIndex {
        let mut index = FlatIndex::new(2);
        index.add_batch(vectors).unwrap();
        index
    }

    #[test]
    fn positions_follow_append_order() {
        let mut index = FlatIndex::new(2);
        let first: [[f32; 2]; 2] = [[0.0, 0.0], [1.0, 1.0]];
        let second: [[f32; 2]; 1] = [[2.0, 2.0]];
        assert_eq!(index.add_batch(&first).unwrap(), 0);
        assert_eq!(index.add_batch(&second).unwrap(), 2);
        assert_eq!(index.len(), 3);
        assert_eq!(index.vector(2), Some(&[2.0, 2.0][..]));
        assert_eq!(index.vector(3), None);
    }

    #[test]
    fn wrong_dimension_rejects_whole_batch() {
        let mut index = FlatIndex::new(2);
        let batch: Vec<Vec<f32>> = vec![vec![0.0, 0.0], vec![1.0, 1.0, 1.0]];
        let err = index.add_batch(&batch).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn search_orders_by_squared_distance() {
        let index = index_with(&[[3.0, 0.0], [1.0, 0.0], [0.0, 2.0]]);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        assert_eq!(hits[0].distance, 1.0);
        assert_eq!(hits[1].distance, 4.0);
        assert_eq!(hits[2].distance, 9.0);
    }

    #[test]
    fn search_caps_k_at_len() {
        let index = index_with(&[[0.0, 0.0], [1.0, 0.0]]);
        assert_eq!(index.search(&[0.0, 0.0], 10).unwrap().len(), 2);
        assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = index_with(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [5.0, 5.0]]);
        let hits = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
    }

    #[test]
    fn search_on_empty_index() {
        let index = FlatIndex::new(4);
        assert!(index.search(&[0.0; 4], 5).unwrap().is_empty());
    }

    #[test]
    fn query_dimension_is_checked() {
        let index = index_with(&[[0.0, 0.0]]);
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn truncate_and_reset() {
        let mut index = index_with(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        index.truncate(1);
        assert_eq!(index.len(), 1);
        index.reset();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 2);
    }

    #[test]
    fn from_flat_validates_length() {
        assert!(FlatIndex::from_flat(3, vec![0.0; 6]).is_ok());
        assert!(matches!(
            FlatIndex::from_flat(3, vec![0.0; 5]),
            Err(IndexError::Corrupt(_))
        ));
    }
}
