//! Exact nearest-neighbour vector indexes
//!
//! An index holds N vectors of one fixed dimension, addressed by insertion
//! position in `[0, N)`. Search ranks every stored vector by squared
//! Euclidean distance to the query, nearest first.
//!
//! # Usage
//!
//! ```ignore
//! use medrag_lib::index::{FlatIndex, VectorIndex};
//!
//! let mut index = FlatIndex::new(3)?;
//! index.add(&[vec![0.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]])?;
//!
//! let neighbors = index.search(&[0.9, 0.0, 0.0], 1)?;
//! assert_eq!(neighbors[0].position, 1);
//! ```

use std::cmp::Ordering;

use crate::embed::Embedding;
use crate::Result;

/// A stored vector's position and its distance to the query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Insertion position of the matched vector
    pub position: usize,
    /// Squared Euclidean distance (0.0 is an exact match, unbounded above)
    pub distance: f32,
}

// Ascending distance, then ascending position so equal distances rank
// deterministically.
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

/// Trait for vector index backends
pub trait VectorIndex: Send + Sync {
    /// Append vectors in order.
    ///
    /// Fails with `DimensionMismatch` if any vector has the wrong length, in
    /// which case nothing is added.
    fn add(&mut self, vectors: &[Embedding]) -> Result<()>;

    /// Find the `k` nearest stored vectors.
    ///
    /// Returns `min(k, len)` neighbours sorted by ascending distance. `k == 0`
    /// is an `InvalidArgument` error; an empty index yields an empty vec.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Dimension every stored vector must have
    fn dimension(&self) -> usize;

    /// Number of stored vectors
    fn len(&self) -> usize;

    /// Check if index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

mod flat;

pub use flat::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_euclidean() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_euclidean(&[1.5, -2.0], &[1.5, -2.0]), 0.0);
    }

    #[test]
    fn test_neighbor_ordering_breaks_ties_by_position() {
        let mut neighbors = vec![
            Neighbor { position: 3, distance: 1.0 },
            Neighbor { position: 1, distance: 1.0 },
            Neighbor { position: 2, distance: 0.5 },
        ];
        neighbors.sort();

        let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![2, 1, 3]);
    }
}
