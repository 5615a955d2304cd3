//! Compressed sparse row storage for weights matrices

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::weights::{Key, WeightEntry};

/// Read-only CSR view of a square weights matrix.
///
/// Row `i` owns the entries `values[row_index[i]..row_index[i + 1]]`, paired
/// with the same range of `col_index`. Built once and never mutated.
///
/// # Example
///
/// ```ignore
/// use spatialstats_core::weights::{SparseWeightsMatrix, WeightEntry};
///
/// let keys = vec!["a", "b", "c"];
/// let mut rows = HashMap::new();
/// rows.insert("a", vec![WeightEntry::new("c", 1.0)]);
/// rows.insert("b", vec![WeightEntry::new("b", 1.0)]);
/// rows.insert("c", vec![WeightEntry::new("a", 1.0)]);
///
/// let csr = SparseWeightsMatrix::build(&rows, &keys, 3)?;
/// assert_eq!(csr.row_index(), &[0, 1, 2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SparseWeightsMatrix {
    n: usize,
    values: Vec<f64>,
    col_index: Vec<usize>,
    row_index: Vec<usize>,
}

impl SparseWeightsMatrix {
    /// Build a CSR matrix from a dictionary of rows keyed by observation id.
    ///
    /// `num_rows` is the declared row count and must equal `keys.len()`.
    pub fn build<K: Key>(
        rows_by_key: &HashMap<K, Vec<WeightEntry<K>>>,
        keys: &[K],
        num_rows: usize,
    ) -> Result<Self> {
        if num_rows != keys.len() {
            return Err(Error::RowCountMismatch {
                declared: num_rows,
                keys: keys.len(),
            });
        }

        // First pass: column lookup and non-zero count
        let mut lookup: HashMap<&K, usize> = HashMap::with_capacity(keys.len());
        let mut nnz = 0;
        for (i, key) in keys.iter().enumerate() {
            if lookup.insert(key, i).is_some() {
                return Err(Error::InvalidWeights(format!("duplicate key {:?}", key)));
            }
            let row = rows_by_key
                .get(key)
                .ok_or_else(|| Error::UnknownKey(format!("{:?}", key)))?;
            nnz += row.len();
        }

        // Second pass: fill values and col_index row-major
        let mut values = Vec::with_capacity(nnz);
        let mut col_index = Vec::with_capacity(nnz);
        let mut row_index = Vec::with_capacity(num_rows + 1);

        for key in keys {
            row_index.push(values.len());
            for entry in &rows_by_key[key] {
                let col = *lookup.get(&entry.id).ok_or_else(|| Error::UnknownNeighbor {
                    key: format!("{:?}", key),
                    neighbor: format!("{:?}", entry.id),
                })?;
                if !entry.weight.is_finite() {
                    return Err(Error::InvalidWeights(format!(
                        "non-finite weight {} from {:?} to {:?}",
                        entry.weight, key, entry.id
                    )));
                }
                values.push(entry.weight);
                col_index.push(col);
            }
        }
        row_index.push(nnz);

        Ok(Self {
            n: num_rows,
            values,
            col_index,
            row_index,
        })
    }

    /// Build from rows of `(column, weight)` pairs, one row per observation.
    pub fn from_index_rows(rows: &[Vec<(usize, f64)>]) -> Result<Self> {
        let n = rows.len();
        for (i, row) in rows.iter().enumerate() {
            for &(col, weight) in row {
                if col >= n {
                    return Err(Error::IndexOutOfRange { index: col, len: n });
                }
                if !weight.is_finite() {
                    return Err(Error::InvalidWeights(format!(
                        "non-finite weight {} in row {}",
                        weight, i
                    )));
                }
            }
        }
        Ok(Self::from_indexed_rows(rows))
    }

    /// Build from rows already resolved to column indices.
    ///
    /// Callers guarantee every column is `< rows.len()`.
    pub(crate) fn from_indexed_rows(rows: &[Vec<(usize, f64)>]) -> Self {
        let n = rows.len();
        let nnz = rows.iter().map(Vec::len).sum();
        let mut values = Vec::with_capacity(nnz);
        let mut col_index = Vec::with_capacity(nnz);
        let mut row_index = Vec::with_capacity(n + 1);

        for row in rows {
            row_index.push(values.len());
            for &(col, weight) in row {
                values.push(weight);
                col_index.push(col);
            }
        }
        row_index.push(nnz);

        Self {
            n,
            values,
            col_index,
            row_index,
        }
    }

    // Dimensions

    /// Number of rows (and columns)
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    // Raw CSR arrays

    /// Stored weights, row-major
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Column of each stored weight
    pub fn col_index(&self) -> &[usize] {
        &self.col_index
    }

    /// Offset of the first entry of each row; length `n + 1`
    pub fn row_index(&self) -> &[usize] {
        &self.row_index
    }

    /// Range of entry offsets belonging to `row`
    pub fn row_range(&self, row: usize) -> Result<Range<usize>> {
        self.check_row(row)?;
        Ok(self.span(row))
    }

    /// Entry offsets of `row`; callers guarantee `row < n`
    #[inline]
    fn span(&self, row: usize) -> Range<usize> {
        self.row_index[row]..self.row_index[row + 1]
    }

    /// Iterate over `(col, weight)` pairs of one row
    pub fn row(&self, row: usize) -> Result<impl Iterator<Item = (usize, f64)> + '_> {
        let range = self.row_range(row)?;
        Ok(self.col_index[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied()))
    }

    /// Multiply the matrix by `vec`.
    ///
    /// Mirrors scipy's `csr_matvec`; O(nnz).
    pub fn mulvec(&self, vec: &[f64]) -> Result<Vec<f64>> {
        self.check_len(vec)?;
        Ok((0..self.n).map(|i| self.dot_row_unchecked(vec, i)).collect())
    }

    /// Dot product of one row with `vec`; equal to `mulvec(vec)[row]`
    pub fn dot_row(&self, vec: &[f64], row: usize) -> Result<f64> {
        self.check_len(vec)?;
        self.check_row(row)?;
        Ok(self.dot_row_unchecked(vec, row))
    }

    /// Inner loop shared by `mulvec` and `dot_row`
    #[inline]
    fn dot_row_unchecked(&self, vec: &[f64], row: usize) -> f64 {
        let range = self.span(row);
        self.values[range.clone()]
            .iter()
            .zip(&self.col_index[range])
            .map(|(w, &j)| w * vec[j])
            .sum()
    }

    /// Sparse `(row, col) -> weight` map of the stored entries.
    ///
    /// Repeated `(row, col)` entries are summed.
    pub fn coordinates(&self) -> BTreeMap<(usize, usize), f64> {
        let mut coords = BTreeMap::new();
        let mut row = 0;
        for (k, (&col, &value)) in self.col_index.iter().zip(&self.values).enumerate() {
            // skip past rows that end at or before k, including empty ones
            while k >= self.row_index[row + 1] {
                row += 1;
            }
            *coords.entry((row, col)).or_insert(0.0) += value;
        }
        coords
    }

    /// Materialize the full n x n matrix. O(n²) memory.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n, self.n));
        for row in 0..self.n {
            for k in self.span(row) {
                dense[(row, self.col_index[k])] += self.values[k];
            }
        }
        dense
    }

    /// Sum of the diagonal entries
    pub fn trace(&self) -> f64 {
        (0..self.n)
            .map(|row| {
                self.span(row)
                    .filter(|&k| self.col_index[k] == row)
                    .map(|k| self.values[k])
                    .sum::<f64>()
            })
            .sum()
    }

    /// Sum of each row's weights
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n)
            .map(|row| self.values[self.span(row)].iter().sum())
            .collect()
    }

    fn check_len(&self, vec: &[f64]) -> Result<()> {
        if vec.len() != self.n {
            return Err(Error::DimensionMismatch {
                expected: self.n,
                actual: vec.len(),
            });
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.n {
            return Err(Error::IndexOutOfRange {
                index: row,
                len: self.n,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn abc() -> (Vec<&'static str>, HashMap<&'static str, Vec<WeightEntry<&'static str>>>) {
        let keys = vec!["a", "b", "c"];
        let mut rows = HashMap::new();
        rows.insert("a", vec![WeightEntry::new("c", 1.0)]);
        rows.insert("b", vec![WeightEntry::new("b", 1.0)]);
        rows.insert("c", vec![WeightEntry::new("a", 1.0)]);
        (keys, rows)
    }

    #[test]
    fn test_build_arrays() {
        let (keys, rows) = abc();
        let csr = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap();
        assert_eq!(csr.n(), 3);
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.values(), &[1.0, 1.0, 1.0]);
        assert_eq!(csr.col_index(), &[2, 1, 0]);
        assert_eq!(csr.row_index(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_build_row_count_mismatch() {
        let (keys, rows) = abc();
        let err = SparseWeightsMatrix::build(&rows, &keys, 4).unwrap_err();
        assert_eq!(err, Error::RowCountMismatch { declared: 4, keys: 3 });
    }

    #[test]
    fn test_build_unknown_neighbor() {
        let (keys, mut rows) = abc();
        rows.insert("a", vec![WeightEntry::new("z", 1.0)]);
        let err = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap_err();
        assert!(matches!(err, Error::UnknownNeighbor { .. }));
    }

    #[test]
    fn test_build_missing_row() {
        let (keys, mut rows) = abc();
        rows.remove("b");
        let err = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap_err();
        assert!(matches!(err, Error::UnknownKey(_)));
    }

    #[test]
    fn test_build_rejects_nan_weight() {
        let (keys, mut rows) = abc();
        rows.insert("c", vec![WeightEntry::new("a", f64::NAN)]);
        let err = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidWeights(_)));
    }

    #[test]
    fn test_build_rejects_duplicate_keys() {
        let keys = vec!["a", "a"];
        let mut rows = HashMap::new();
        rows.insert("a", vec![WeightEntry::new("a", 1.0)]);
        let err = SparseWeightsMatrix::build(&rows, &keys, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidWeights(_)));
    }

    #[test]
    fn test_row_range_out_of_range() {
        let (keys, rows) = abc();
        let csr = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap();
        assert_eq!(csr.row_range(2).unwrap(), 2..3);
        assert_eq!(
            csr.row_range(3).unwrap_err(),
            Error::IndexOutOfRange { index: 3, len: 3 }
        );
        assert!(csr.row(3).is_err());
    }

    #[test]
    fn test_mulvec() {
        let (keys, rows) = abc();
        let csr = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap();
        assert_eq!(csr.mulvec(&[1.0, 2.0, 3.0]).unwrap(), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_mulvec_dimension_mismatch() {
        let (keys, rows) = abc();
        let csr = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap();
        let err = csr.mulvec(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err, Error::DimensionMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn test_dot_row() {
        let (keys, rows) = abc();
        let csr = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap();
        assert_relative_eq!(csr.dot_row(&[1.0, 2.0, 3.0], 0).unwrap(), 3.0);
        assert!(matches!(
            csr.dot_row(&[1.0, 2.0, 3.0], 3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_coordinates_with_empty_rows() {
        // rows 1 and 2 empty, row 3 has an entry
        let rows = vec![vec![(1, 2.0)], vec![], vec![], vec![(0, 1.0), (3, 0.5)]];
        let csr = SparseWeightsMatrix::from_indexed_rows(&rows);
        let coords = csr.coordinates();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[&(0, 1)], 2.0);
        assert_eq!(coords[&(3, 0)], 1.0);
        assert_eq!(coords[&(3, 3)], 0.5);
    }

    #[test]
    fn test_from_index_rows_validates() {
        assert!(matches!(
            SparseWeightsMatrix::from_index_rows(&[vec![(2, 1.0)], vec![]]),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(SparseWeightsMatrix::from_index_rows(&[vec![(1, 1.0)], vec![(0, 0.5)]]).is_ok());
    }

    #[test]
    fn test_trace_and_row_sums() {
        let (keys, rows) = abc();
        let csr = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap();
        assert_relative_eq!(csr.trace(), 1.0);
        assert_eq!(csr.row_sums(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_to_dense() {
        let (keys, rows) = abc();
        let dense = SparseWeightsMatrix::build(&rows, &keys, 3).unwrap().to_dense();
        assert_eq!(dense[(0, 2)], 1.0);
        assert_eq!(dense[(1, 1)], 1.0);
        assert_eq!(dense[(2, 0)], 1.0);
        assert_relative_eq!(dense.sum(), 3.0);
    }

    fn sparse_rows() -> impl Strategy<Value = Vec<Vec<(usize, f64)>>> {
        (1usize..12).prop_flat_map(|n| {
            prop::collection::vec(
                prop::collection::vec((0..n, -5.0f64..5.0), 0..n),
                n,
            )
        })
    }

    proptest! {
        #[test]
        fn prop_mulvec_matches_dense(rows in sparse_rows(), seed in prop::collection::vec(-10.0f64..10.0, 12)) {
            let csr = SparseWeightsMatrix::from_indexed_rows(&rows);
            let n = csr.n();
            let v = &seed[..n];
            let dense = csr.to_dense();
            let expected: Vec<f64> = (0..n)
                .map(|i| (0..n).map(|j| dense[(i, j)] * v[j]).sum())
                .collect();
            let got = csr.mulvec(v).unwrap();
            for (a, b) in got.iter().zip(&expected) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_row_index_invariants(rows in sparse_rows()) {
            let csr = SparseWeightsMatrix::from_indexed_rows(&rows);
            let ri = csr.row_index();
            prop_assert_eq!(ri[0], 0);
            prop_assert_eq!(ri[csr.n()], csr.nnz());
            prop_assert!(ri.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
