//! Monte Carlo permutation inference
//!
//! Two protocols share one counting rule:
//!
//! - **Global**: each draw is a full permutation of the observations; the
//!   statistic is recomputed on the permuted vector.
//! - **Local (conditional)**: for observation i, its own value stays put and
//!   its neighbors' values are drawn without replacement from the other n-1
//!   observations.
//!
//! With `r` draws at least as large as the observed value, `r` is folded to
//! the smaller tail (`r = permutations - r` when that is smaller) and the
//! pseudo p-value is `(r + 1) / (permutations + 1)`.
//!
//! Every draw (global) or observation (local) gets its own ChaCha8 stream of
//! the seed, so results do not depend on how work is split across threads.

use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spatialstats_core::{Error, Result, SparseWeightsMatrix};
use spatialstats_parallel::{ParallelStrategy, ProcessingMode};

/// Default number of permutations
pub const DEFAULT_PERMUTATIONS: usize = 99;

/// Parameters for a permutation test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationParams {
    /// Number of random permutations to draw
    pub permutations: usize,
    /// Seed for reproducible draws; `None` draws a seed from the OS
    pub seed: Option<u64>,
}

impl Default for PermutationParams {
    fn default() -> Self {
        Self {
            permutations: DEFAULT_PERMUTATIONS,
            seed: None,
        }
    }
}

impl PermutationParams {
    pub fn seeded(permutations: usize, seed: u64) -> Self {
        Self {
            permutations,
            seed: Some(seed),
        }
    }
}

pub(crate) fn validate_permutations(permutations: usize) -> Result<()> {
    if permutations == 0 {
        return Err(Error::InvalidWeights(
            "at least one permutation is required for a p-value".into(),
        ));
    }
    Ok(())
}

pub(crate) fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Independent random stream `stream` of `seed`
pub fn substream(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Fold the count of draws `>=` observed and turn it into a pseudo p-value
pub fn fold_p_value(r: usize, permutations: usize) -> f64 {
    let r = if permutations - r < r {
        permutations - r
    } else {
        r
    };
    (r as f64 + 1.0) / (permutations as f64 + 1.0)
}

/// Global permutation test.
///
/// `stat` receives an ordering where position `i` takes the value of
/// observation `order[i]`.
pub(crate) fn global_test<F>(
    observed: f64,
    n: usize,
    permutations: usize,
    seed: u64,
    mode: ProcessingMode,
    stat: F,
) -> Result<f64>
where
    F: Fn(&[usize]) -> Result<f64> + Sync,
{
    if observed.is_nan() {
        return Ok(f64::NAN);
    }

    let draws = mode.par_map(0..permutations, |p| {
        let mut rng = substream(seed, p as u64);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        stat(&order).map(|v| v >= observed)
    });

    let mut r = 0;
    for extreme in draws {
        if extreme? {
            r += 1;
        }
    }
    Ok(fold_p_value(r, permutations))
}

/// Conditional (local) permutation test.
///
/// For each row `i` of `neighborhood`, `stat_at(i, substitutes)` is called
/// once per draw, where `substitutes[e]` is the observation whose value
/// stands in for entry `e` of row `i`. Self entries always map to `i`.
pub(crate) fn local_test<F>(
    observed: &[f64],
    neighborhood: &SparseWeightsMatrix,
    permutations: usize,
    seed: u64,
    mode: ProcessingMode,
    stat_at: F,
) -> Result<Vec<f64>>
where
    F: Fn(usize, &[usize]) -> Result<f64> + Sync,
{
    let n = neighborhood.n();
    if observed.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: observed.len(),
        });
    }

    let results = mode.par_map(0..n, |i| {
        if observed[i].is_nan() {
            return Ok(f64::NAN);
        }

        let cols = &neighborhood.col_index()[neighborhood.row_range(i)?];
        let k = cols.iter().filter(|&&j| j != i).count();
        if k > n - 1 {
            return Err(Error::InvalidWeights(format!(
                "row {} has {} neighbors but only {} other observations",
                i,
                k,
                n - 1
            )));
        }

        let mut rng = substream(seed, i as u64);
        let mut substitutes = vec![i; cols.len()];
        let mut r = 0;
        for _ in 0..permutations {
            let mut drawn = index::sample(&mut rng, n - 1, k)
                .into_iter()
                .map(|m| if m < i { m } else { m + 1 });
            for (slot, &col) in substitutes.iter_mut().zip(cols) {
                if col != i {
                    if let Some(j) = drawn.next() {
                        *slot = j;
                    }
                }
            }
            if stat_at(i, &substitutes)? >= observed[i] {
                r += 1;
            }
        }
        Ok(fold_p_value(r, permutations))
    });

    results.into_iter().collect()
}
