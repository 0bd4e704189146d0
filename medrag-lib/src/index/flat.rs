use tracing::debug;

use crate::embed::Embedding;
use crate::index::{squared_euclidean, Neighbor, VectorIndex};
use crate::{Error, Result};

/// Flat (brute-force) index over contiguous `f32` storage.
///
/// Every vector is kept verbatim; search is an exact linear scan. At corpus
/// sizes of a few thousand records this is both exact and fast enough.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidArgument("index dimension must be at least 1".to_string()));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Build an index from a batch of vectors sharing one dimension.
    pub fn build(dimension: usize, vectors: &[Embedding]) -> Result<Self> {
        let mut index = Self::new(dimension)?;
        index.add(vectors)?;
        Ok(index)
    }

    /// Rebuild an index from its raw row-major storage.
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self> {
        let index = Self::new(dimension)?;
        if data.len() % dimension != 0 {
            return Err(Error::CorruptIndex(format!(
                "{} floats do not divide into vectors of dimension {dimension}",
                data.len()
            )));
        }
        Ok(Self { data, ..index })
    }

    /// Raw row-major storage, `len() * dimension()` floats.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Vector stored at `position`.
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, vectors: &[Embedding]) -> Result<()> {
        // validate the whole batch before touching storage
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_euclidean(query, vector),
            })
            .collect();

        let k = k.min(neighbors.len());
        if k < neighbors.len() {
            neighbors.select_nth_unstable(k - 1);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable();

        debug!(candidates = self.len(), returned = neighbors.len(), "flat search");
        Ok(neighbors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatIndex {
        FlatIndex::build(
            2,
            &[
                vec![0.0, 1.0], // 0: distance 2 from [1, 0]
                vec![1.0, 0.0], // 1: exact match
                vec![0.5, 0.5], // 2: distance 0.5
                vec![2.0, 0.0], // 3: distance 1
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_and_len() {
        let index = sample();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dimension(), 2);
        assert_eq!(index.vector(2), Some(&[0.5, 0.5][..]));
        assert_eq!(index.vector(4), None);
    }

    #[test]
    fn test_search_returns_sorted() {
        let index = sample();
        let results = index.search(&[1.0, 0.0], 4).unwrap();

        let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 0]);
        assert_eq!(results[0].distance, 0.0);
        assert!((results[1].distance - 0.5).abs() < 1e-6);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_partial_selection_matches_full_sort() {
        let index = sample();
        let full = index.search(&[1.0, 0.0], 4).unwrap();
        let top2 = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(top2, full[..2].to_vec());
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let index = sample();
        let results = index.search(&[0.0, 0.0], 100).unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_search_ties_break_by_position() {
        let index = FlatIndex::build(1, &[vec![1.0], vec![-1.0], vec![1.0]]).unwrap();
        let results = index.search(&[0.0], 3).unwrap();

        let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        let top1 = index.search(&[0.0], 1).unwrap();
        assert_eq!(top1[0].position, 0);
    }

    #[test]
    fn test_search_zero_k() {
        let index = sample();
        assert!(matches!(index.search(&[1.0, 0.0], 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_search_wrong_query_dimension() {
        let index = sample();
        let err = index.search(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_empty_search() {
        let index = FlatIndex::new(3).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_add_mismatched_dimension_is_atomic() {
        let mut index = FlatIndex::build(3, &[vec![1.0, 2.0, 3.0]]).unwrap();
        let before = index.clone();

        let err = index
            .add(&[vec![4.0, 5.0, 6.0], vec![1.0, 2.0, 3.0, 4.0]])
            .unwrap_err();

        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 4 }));
        assert_eq!(index, before);
    }

    #[test]
    fn test_from_raw_rejects_ragged_data() {
        assert!(FlatIndex::from_raw(3, vec![0.0; 7]).is_err());
        assert_eq!(FlatIndex::from_raw(3, vec![0.0; 6]).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(FlatIndex::new(0), Err(Error::InvalidArgument(_))));
    }
}
