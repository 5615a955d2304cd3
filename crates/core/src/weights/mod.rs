//! Spatial weights: the neighbor graph every statistic runs over
//!
//! - [`WeightsMatrix`]: ordered keys plus per-row neighbor lists
//! - [`SparseWeightsMatrix`]: compressed sparse row view used on the hot path

mod csr;
mod matrix;

pub use csr::SparseWeightsMatrix;
pub use matrix::WeightsMatrix;

use std::fmt::Debug;
use std::hash::Hash;

/// Observation identifier usable as a weights matrix key.
///
/// Implemented for every type that is cloneable, hashable and thread-safe,
/// so integer ids and string ids both work.
pub trait Key: Clone + Eq + Hash + Debug + Send + Sync {}

impl<T> Key for T where T: Clone + Eq + Hash + Debug + Send + Sync {}

/// One neighbor of a row: the neighbor's key and the edge weight
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightEntry<K> {
    pub id: K,
    pub weight: f64,
}

impl<K> WeightEntry<K> {
    pub fn new(id: K, weight: f64) -> Self {
        Self { id, weight }
    }
}

/// Anything that can hand out a CSR view of its weights
pub trait AsSparse {
    fn as_sparse(&self) -> &SparseWeightsMatrix;
}

impl AsSparse for SparseWeightsMatrix {
    fn as_sparse(&self) -> &SparseWeightsMatrix {
        self
    }
}

impl<K: Key> AsSparse for WeightsMatrix<K> {
    fn as_sparse(&self) -> &SparseWeightsMatrix {
        self.sparse()
    }
}
