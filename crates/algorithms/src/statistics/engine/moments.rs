//! Moment helpers for analytic inference

use ndarray::Array2;
use spatialstats_core::{Result, SparseWeightsMatrix};

/// Cliff–Ord weight sums
///
/// - `s0 = Σ_i Σ_j w_ij`
/// - `s1 = ½ Σ_i Σ_j (w_ij + w_ji)²`
/// - `s2 = Σ_i (Σ_j w_ij + Σ_j w_ji)²`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightMoments {
    pub s0: f64,
    pub s1: f64,
    pub s2: f64,
}

impl WeightMoments {
    /// Compute from the dense matrix. O(n²).
    pub fn from_dense(w: &Array2<f64>) -> Self {
        let n = w.nrows();
        let s0 = w.sum();

        let mut s1 = 0.0;
        for i in 0..n {
            for j in 0..n {
                let v = w[(i, j)] + w[(j, i)];
                s1 += v * v;
            }
        }
        s1 *= 0.5;

        let row_sums = w.sum_axis(ndarray::Axis(1));
        let col_sums = w.sum_axis(ndarray::Axis(0));
        let s2 = row_sums
            .iter()
            .zip(col_sums.iter())
            .map(|(r, c)| (r + c) * (r + c))
            .sum();

        Self { s0, s1, s2 }
    }
}

/// Mean and variance of a local weighted sum under conditional randomization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionalMoments {
    pub mean: f64,
    pub variance: f64,
}

/// Moments of `S_i = Σ_e w_e v[sub(e)]` over row `i` of `w` when every
/// non-self entry draws, without replacement, from the values of the other
/// n-1 observations and self entries keep `v_i`.
///
/// With the others' mean μ and population variance σ², `N = n - 1`, and the
/// non-self weights summing to `W` with squares summing to `W2`:
///
/// - `E[S_i] = w_ii v_i + μ W`
/// - `Var[S_i] = σ² (W2 - (W² - W2) / (N - 1))`
pub fn conditional_moments(w: &SparseWeightsMatrix, v: &[f64]) -> Result<Vec<ConditionalMoments>> {
    let n = v.len();
    if n < 2 {
        return Ok(vec![
            ConditionalMoments {
                mean: f64::NAN,
                variance: f64::NAN,
            };
            n
        ]);
    }

    let total: f64 = v.iter().sum();
    let total_sq: f64 = v.iter().map(|x| x * x).sum();
    let others = (n - 1) as f64;

    (0..n)
        .map(|i| -> Result<ConditionalMoments> {
            let mu = (total - v[i]) / others;
            let sigma2 = ((total_sq - v[i] * v[i]) / others - mu * mu).max(0.0);

            let mut fixed = 0.0;
            let mut w_sum = 0.0;
            let mut w_sq = 0.0;
            for (j, weight) in w.row(i)? {
                if j == i {
                    fixed += weight * v[i];
                } else {
                    w_sum += weight;
                    w_sq += weight * weight;
                }
            }

            let variance = if n > 2 {
                sigma2 * (w_sq - (w_sum * w_sum - w_sq) / (others - 1.0))
            } else {
                sigma2 * w_sq
            };

            Ok(ConditionalMoments {
                mean: fixed + mu * w_sum,
                variance: variance.max(0.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weight_moments_symmetric_binary() {
        // path a - b - c
        let w = ndarray::array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let m = WeightMoments::from_dense(&w);
        assert_relative_eq!(m.s0, 4.0);
        // each of the 4 directed entries contributes (1+1)² / 2
        assert_relative_eq!(m.s1, 8.0);
        // degrees 1, 2, 1 -> (2)² + (4)² + (2)²
        assert_relative_eq!(m.s2, 24.0);
    }

    #[test]
    fn test_conditional_moments_match_enumeration() {
        // row 0 has neighbors 1 and 2; enumerate every ordered draw of two
        // values out of observations 1..4
        let w = SparseWeightsMatrix::from_index_rows(&[
            vec![(1, 1.0), (2, 2.0)],
            vec![],
            vec![],
            vec![],
        ])
        .unwrap();
        let v = [1.0, 4.0, -2.0, 7.0];
        let m = conditional_moments(&w, &v).unwrap()[0];

        let others = [4.0, -2.0, 7.0];
        let mut draws = Vec::new();
        for a in 0..3 {
            for b in 0..3 {
                if a != b {
                    draws.push(others[a] * 1.0 + others[b] * 2.0);
                }
            }
        }
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / draws.len() as f64;
        assert_relative_eq!(m.mean, mean, epsilon = 1e-12);
        assert_relative_eq!(m.variance, var, epsilon = 1e-12);
    }

    #[test]
    fn test_conditional_moments_self_entry_is_fixed() {
        let w = SparseWeightsMatrix::from_index_rows(&[vec![(0, 1.0)], vec![], vec![]]).unwrap();
        let m = conditional_moments(&w, &[3.0, 1.0, 2.0]).unwrap()[0];
        assert_relative_eq!(m.mean, 3.0);
        assert_relative_eq!(m.variance, 0.0);
    }
}
