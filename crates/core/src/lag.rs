//! Spatial lag operators
//!
//! Each operator combines a weights matrix with a vector aligned to its keys
//! and returns one aggregate per observation:
//!
//! - **neighbor_sum**: Σ_j w_ij v_j
//! - **neighbor_average**: neighbor sum divided by the row's weight sum
//! - **window_sum** / **window_average**: the same over the self-inclusive
//!   (windowed) neighborhood

use crate::error::Result;
use crate::weights::{AsSparse, Key, WeightsMatrix};

/// Weighted sum of neighbor values: `W v`
pub fn neighbor_sum<W: AsSparse + ?Sized>(w: &W, v: &[f64]) -> Result<Vec<f64>> {
    w.as_sparse().mulvec(v)
}

/// Weighted average of neighbor values.
///
/// Observations whose row sums to zero (no neighbors) get 0.
pub fn neighbor_average<W: AsSparse + ?Sized>(w: &W, v: &[f64]) -> Result<Vec<f64>> {
    let csr = w.as_sparse();
    let sums = csr.mulvec(v)?;
    Ok(sums
        .into_iter()
        .zip(csr.row_sums())
        .map(|(s, total)| if total == 0.0 { 0.0 } else { s / total })
        .collect())
}

/// Neighbor sum over the windowed matrix, so each observation counts itself
pub fn window_sum<K: Key>(w: &WeightsMatrix<K>, v: &[f64]) -> Result<Vec<f64>> {
    neighbor_sum(&w.window(), v)
}

/// Neighbor average over the windowed matrix
pub fn window_average<K: Key>(w: &WeightsMatrix<K>, v: &[f64]) -> Result<Vec<f64>> {
    neighbor_average(&w.window(), v)
}
