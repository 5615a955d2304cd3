//! Logical weights matrix type

use std::collections::HashMap;
use std::sync::OnceLock;

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::weights::{Key, SparseWeightsMatrix, WeightEntry};

/// A square spatial weights matrix over an ordered set of observation keys.
///
/// The order of `keys` is the canonical index space `0..n`: every vector
/// combined with this matrix must be aligned to it. Rows store
/// `(neighbor index, weight)` pairs in input order.
///
/// The matrix is immutable; [`standardize`](Self::standardize) and
/// [`window`](Self::window) return new matrices with the same keys.
///
/// # Example
///
/// ```ignore
/// use spatialstats_core::weights::{WeightsMatrix, WeightEntry};
///
/// let w = WeightsMatrix::from_ordered_rows(vec![
///     (1, vec![WeightEntry::new(2, 1.0), WeightEntry::new(4, 1.0)]),
///     (2, vec![WeightEntry::new(1, 1.0)]),
///     (3, vec![WeightEntry::new(4, 1.0)]),
///     (4, vec![WeightEntry::new(1, 1.0), WeightEntry::new(3, 1.0)]),
/// ])?;
/// let ws = w.standardize();
/// ```
#[derive(Debug, Clone)]
pub struct WeightsMatrix<K: Key> {
    keys: Vec<K>,
    index: HashMap<K, usize>,
    rows: Vec<Vec<(usize, f64)>>,
    sparse: OnceLock<SparseWeightsMatrix>,
}

impl<K: Key> WeightsMatrix<K> {
    /// Create a weights matrix from a dictionary of rows.
    ///
    /// `num_rows` is the declared row count; it must match the number of
    /// distinct keys, and every key must have exactly one row.
    pub fn from_rows(
        mut rows: HashMap<K, Vec<WeightEntry<K>>>,
        keys: Vec<K>,
        num_rows: usize,
    ) -> Result<Self> {
        if num_rows != keys.len() {
            return Err(Error::RowCountMismatch {
                declared: num_rows,
                keys: keys.len(),
            });
        }

        let index = Self::index_keys(&keys)?;

        let mut ordered = Vec::with_capacity(keys.len());
        for key in &keys {
            let row = rows
                .remove(key)
                .ok_or_else(|| Error::UnknownKey(format!("{:?}", key)))?;
            ordered.push(row);
        }
        if let Some(extra) = rows.keys().next() {
            return Err(Error::UnknownKey(format!("{:?}", extra)));
        }

        Self::assemble(keys, index, ordered)
    }

    /// Create a weights matrix whose key order is the order of `rows`
    pub fn from_ordered_rows(rows: Vec<(K, Vec<WeightEntry<K>>)>) -> Result<Self> {
        let (keys, entries): (Vec<K>, Vec<Vec<WeightEntry<K>>>) = rows.into_iter().unzip();
        let index = Self::index_keys(&keys)?;
        Self::assemble(keys, index, entries)
    }

    fn index_keys(keys: &[K]) -> Result<HashMap<K, usize>> {
        let mut index = HashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            if index.insert(key.clone(), i).is_some() {
                return Err(Error::InvalidWeights(format!("duplicate key {:?}", key)));
            }
        }
        Ok(index)
    }

    fn assemble(
        keys: Vec<K>,
        index: HashMap<K, usize>,
        entries: Vec<Vec<WeightEntry<K>>>,
    ) -> Result<Self> {
        let mut rows = Vec::with_capacity(entries.len());
        for (key, row) in keys.iter().zip(entries) {
            let mut resolved = Vec::with_capacity(row.len());
            for entry in row {
                let col = *index.get(&entry.id).ok_or_else(|| Error::UnknownNeighbor {
                    key: format!("{:?}", key),
                    neighbor: format!("{:?}", entry.id),
                })?;
                if !entry.weight.is_finite() {
                    return Err(Error::InvalidWeights(format!(
                        "non-finite weight {} from {:?} to {:?}",
                        entry.weight, key, entry.id
                    )));
                }
                resolved.push((col, entry.weight));
            }
            rows.push(resolved);
        }

        Ok(Self::from_parts(keys, index, rows))
    }

    fn from_parts(keys: Vec<K>, index: HashMap<K, usize>, rows: Vec<Vec<(usize, f64)>>) -> Self {
        Self {
            keys,
            index,
            rows,
            sparse: OnceLock::new(),
        }
    }

    // Dimensions

    /// Number of observations
    pub fn n(&self) -> usize {
        self.keys.len()
    }

    /// Whether the matrix has no observations
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Ordered observation keys
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Position of `key` in the key order
    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    // Rows

    /// `(neighbor index, weight)` pairs of row `i`
    pub fn neighbors(&self, i: usize) -> Result<&[(usize, f64)]> {
        self.rows
            .get(i)
            .map(Vec::as_slice)
            .ok_or(Error::IndexOutOfRange {
                index: i,
                len: self.n(),
            })
    }

    /// Neighbors of `key` as weight entries, in row order
    pub fn row(&self, key: &K) -> Option<Vec<WeightEntry<K>>> {
        let i = self.index_of(key)?;
        Some(
            self.rows[i]
                .iter()
                .map(|&(j, w)| WeightEntry::new(self.keys[j].clone(), w))
                .collect(),
        )
    }

    /// Every row keyed by observation, in key order
    pub fn to_rows(&self) -> Vec<(K, Vec<WeightEntry<K>>)> {
        self.keys
            .iter()
            .map(|key| (key.clone(), self.row(key).unwrap_or_default()))
            .collect()
    }

    /// Sum of each row's weights, in key order
    pub fn row_sums(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|&(_, w)| w).sum())
            .collect()
    }

    /// Total weight S0 = Σ_i Σ_j w_ij
    pub fn total_weight(&self) -> f64 {
        self.row_sums().iter().sum()
    }

    // Views

    /// CSR view, built on first use
    pub fn sparse(&self) -> &SparseWeightsMatrix {
        self.sparse
            .get_or_init(|| SparseWeightsMatrix::from_indexed_rows(&self.rows))
    }

    /// Dense n x n matrix
    pub fn dense(&self) -> Array2<f64> {
        self.sparse().to_dense()
    }

    /// Sum of self-weights
    pub fn trace(&self) -> f64 {
        self.sparse().trace()
    }

    // Transforms

    /// Row-standardized copy: each row divided by its sum.
    ///
    /// Rows summing to zero are left as they are.
    pub fn standardize(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let sum: f64 = row.iter().map(|&(_, w)| w).sum();
                if sum == 0.0 {
                    row.clone()
                } else {
                    row.iter().map(|&(j, w)| (j, w / sum)).collect()
                }
            })
            .collect();
        Self::from_parts(self.keys.clone(), self.index.clone(), rows)
    }

    /// Self-inclusive copy: every row gets a self entry of weight 1.
    ///
    /// An existing self entry is overwritten in place, otherwise one is
    /// appended to the end of the row.
    pub fn window(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut row = row.clone();
                let mut found = false;
                for entry in row.iter_mut().filter(|(j, _)| *j == i) {
                    entry.1 = 1.0;
                    found = true;
                }
                if !found {
                    row.push((i, 1.0));
                }
                row
            })
            .collect();
        Self::from_parts(self.keys.clone(), self.index.clone(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn example() -> WeightsMatrix<i32> {
        WeightsMatrix::from_ordered_rows(vec![
            (1, vec![WeightEntry::new(2, 1.0), WeightEntry::new(4, 1.0)]),
            (2, vec![WeightEntry::new(1, 1.0)]),
            (3, vec![WeightEntry::new(4, 1.0)]),
            (4, vec![WeightEntry::new(1, 1.0), WeightEntry::new(3, 1.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_keys_and_index() {
        let w = example();
        assert_eq!(w.n(), 4);
        assert_eq!(w.keys(), &[1, 2, 3, 4]);
        assert_eq!(w.index_of(&3), Some(2));
        assert_eq!(w.index_of(&9), None);
    }

    #[test]
    fn test_from_rows_row_count_mismatch() {
        let mut rows = HashMap::new();
        rows.insert("a", vec![]);
        let err = WeightsMatrix::from_rows(rows, vec!["a"], 2).unwrap_err();
        assert_eq!(err, Error::RowCountMismatch { declared: 2, keys: 1 });
    }

    #[test]
    fn test_from_rows_extra_row() {
        let mut rows = HashMap::new();
        rows.insert("a", vec![]);
        rows.insert("b", vec![]);
        let err = WeightsMatrix::from_rows(rows, vec!["a"], 1).unwrap_err();
        assert!(matches!(err, Error::UnknownKey(_)));
    }

    #[test]
    fn test_unknown_neighbor() {
        let err = WeightsMatrix::from_ordered_rows(vec![("a", vec![WeightEntry::new("b", 1.0)])])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownNeighbor { .. }));
    }

    #[test]
    fn test_duplicate_keys() {
        let err = WeightsMatrix::from_ordered_rows(vec![("a", vec![]), ("a", vec![])]).unwrap_err();
        assert!(matches!(err, Error::InvalidWeights(_)));
    }

    #[test]
    fn test_standardize_example() {
        let ws = example().standardize();
        assert_eq!(
            ws.row(&1).unwrap(),
            vec![WeightEntry::new(2, 0.5), WeightEntry::new(4, 0.5)]
        );
        assert_eq!(ws.row(&2).unwrap(), vec![WeightEntry::new(1, 1.0)]);
        assert_eq!(ws.row(&3).unwrap(), vec![WeightEntry::new(4, 1.0)]);
        assert_eq!(
            ws.row(&4).unwrap(),
            vec![WeightEntry::new(1, 0.5), WeightEntry::new(3, 0.5)]
        );
    }

    #[test]
    fn test_standardize_keeps_empty_rows() {
        let w = WeightsMatrix::from_ordered_rows(vec![
            ("a", vec![WeightEntry::new("b", 3.0)]),
            ("b", vec![]),
        ])
        .unwrap();
        let sums = w.standardize().row_sums();
        assert_relative_eq!(sums[0], 1.0);
        assert_relative_eq!(sums[1], 0.0);
    }

    #[test]
    fn test_window_appends_and_overwrites() {
        let w = WeightsMatrix::from_ordered_rows(vec![
            ("a", vec![WeightEntry::new("a", 0.25), WeightEntry::new("b", 1.0)]),
            ("b", vec![WeightEntry::new("a", 2.0)]),
        ])
        .unwrap();
        let ww = w.window();
        assert_eq!(ww.neighbors(0).unwrap(), &[(0, 1.0), (1, 1.0)]);
        assert_eq!(ww.neighbors(1).unwrap(), &[(0, 2.0), (1, 1.0)]);
        assert_relative_eq!(ww.trace(), 2.0);
        assert_relative_eq!(w.trace(), 0.25);
    }

    #[test]
    fn test_dense_round_trip() {
        let w = example();
        let dense = w.dense();
        for (key, row) in w.to_rows() {
            let i = w.index_of(&key).unwrap();
            for entry in row {
                let j = w.index_of(&entry.id).unwrap();
                assert_eq!(dense[(i, j)], entry.weight);
            }
        }
        assert_relative_eq!(dense.sum(), w.total_weight());
    }

    #[test]
    fn test_neighbors_out_of_range() {
        assert!(matches!(
            example().neighbors(4),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        ));
    }
}
