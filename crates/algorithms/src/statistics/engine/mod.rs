//! Shared machinery behind every statistic
//!
//! A statistic binds one or more [`Variable`]s aligned to the weights keys,
//! caches its results in a [`StatCore`], and gets analytic inference,
//! permutation tests and summaries from the [`GlobalStatistic`] or
//! [`LocalStatistic`] trait. Concrete statistics only supply the formulas.

pub mod memo;
pub mod moments;
pub mod permutation;
pub mod variable;

pub use memo::{StatCore, StatState};
pub use permutation::{fold_p_value, substream, PermutationParams, DEFAULT_PERMUTATIONS};
pub use variable::Variable;

use spatialstats_core::{Error, Key, Result, SparseWeightsMatrix};
use spatialstats_parallel::ProcessingMode;
use tracing::debug;

use crate::statistics::cluster::Cluster;
use memo::PermutationRecord;
use permutation::{global_test, local_test, resolve_seed, validate_permutations};

/// Result of a global permutation summary
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalSummary {
    pub stat: f64,
    pub p: f64,
}

/// One observation of a local permutation summary
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalSummary<K> {
    pub key: K,
    pub stat: f64,
    pub p: f64,
    pub group: Cluster,
}

pub(crate) fn not_implemented(statistic: &'static str, operation: &'static str) -> Error {
    Error::NotImplemented {
        statistic,
        operation,
    }
}

pub(crate) fn not_computable(statistic: &'static str, reason: impl Into<String>) -> Error {
    Error::NotComputable {
        statistic,
        reason: reason.into(),
    }
}

/// A statistic producing one value for the whole dataset.
///
/// Implementors provide [`compute`](Self::compute) and, where a closed form
/// exists, the analytic moments. Everything else is shared.
pub trait GlobalStatistic: Sync {
    const NAME: &'static str;

    /// Number of observations
    fn n(&self) -> usize;

    /// Whether every input variable is bound
    fn is_bound(&self) -> bool;

    fn core(&self) -> &StatCore<f64>;

    fn core_mut(&mut self) -> &mut StatCore<f64>;

    /// Statistic on the bound data, or on the permuted vector when `order`
    /// is given (position `i` takes the value of observation `order[i]`).
    fn compute(&self, order: Option<&[usize]>) -> Result<f64>;

    fn compute_expectation(&self) -> Result<f64> {
        Err(not_implemented(Self::NAME, "expectation"))
    }

    fn compute_variance(&self) -> Result<f64> {
        Err(not_implemented(Self::NAME, "variance"))
    }

    fn state(&self) -> StatState {
        self.core().state(self.is_bound())
    }

    fn set_processing_mode(&mut self, mode: ProcessingMode) {
        self.core_mut().set_mode(mode);
    }

    /// Memoized statistic value
    fn stat(&mut self) -> Result<f64> {
        if let Some(v) = self.core().memo.stat {
            return Ok(v);
        }
        let v = self.compute(None)?;
        self.core_mut().memo.stat = Some(v);
        Ok(v)
    }

    fn expectation(&mut self) -> Result<f64> {
        if let Some(v) = self.core().memo.expectation {
            return Ok(v);
        }
        let v = self.compute_expectation()?;
        self.core_mut().memo.expectation = Some(v);
        Ok(v)
    }

    fn variance(&mut self) -> Result<f64> {
        if let Some(v) = self.core().memo.variance {
            return Ok(v);
        }
        let v = self.compute_variance()?;
        self.core_mut().memo.variance = Some(v);
        Ok(v)
    }

    /// `(stat - expectation) / sqrt(variance)`
    fn z_score(&mut self) -> Result<f64> {
        let stat = self.stat()?;
        let expectation = self.expectation()?;
        let variance = self.variance()?;
        if variance.is_nan() || variance <= 0.0 {
            return Err(not_computable(Self::NAME, "variance is not positive"));
        }
        Ok((stat - expectation) / variance.sqrt())
    }

    /// Pseudo p-value from `permutations` random permutations of the data
    fn mc(&mut self, permutations: usize, seed: Option<u64>) -> Result<f64> {
        validate_permutations(permutations)?;
        if let Some(p) = self.core().cached_p(permutations, seed) {
            return Ok(p);
        }

        let observed = self.stat()?;
        let seed = resolve_seed(seed);
        let mode = self.core().mode();
        debug!(statistic = Self::NAME, permutations, seed, ?mode, "global permutation test");

        let p = global_test(observed, self.n(), permutations, seed, mode, |order| {
            self.compute(Some(order))
        })?;

        debug!(statistic = Self::NAME, p, "global permutation test finished");
        self.core_mut().memo.permutation = Some(PermutationRecord {
            permutations,
            seed,
            p,
        });
        Ok(p)
    }

    fn mc_with(&mut self, params: &PermutationParams) -> Result<f64> {
        self.mc(params.permutations, params.seed)
    }

    /// Statistic and permutation p-value together
    fn summary(&mut self, permutations: usize, seed: Option<u64>) -> Result<GlobalSummary> {
        let stat = self.stat()?;
        let p = self.mc(permutations, seed)?;
        Ok(GlobalSummary { stat, p })
    }
}

/// A statistic producing one value per observation (LISA).
///
/// Implementors provide the full computation, the per-observation value
/// under substituted neighbors, and the cluster classification.
pub trait LocalStatistic: Sync {
    type Key: Key;

    const NAME: &'static str;

    /// Ordered observation keys
    fn keys(&self) -> &[Self::Key];

    /// Whether every input variable is bound
    fn is_bound(&self) -> bool;

    fn core(&self) -> &StatCore<Vec<f64>>;

    fn core_mut(&mut self) -> &mut StatCore<Vec<f64>>;

    /// Weights whose rows define each observation's neighborhood
    fn neighborhood(&self) -> &SparseWeightsMatrix;

    /// Statistic for every observation on the bound data
    fn compute(&self) -> Result<Vec<f64>>;

    /// Statistic at `i` when entry `e` of row `i` of
    /// [`neighborhood`](Self::neighborhood) takes the value of observation
    /// `substitutes[e]`.
    fn compute_at(&self, i: usize, substitutes: &[usize]) -> Result<f64>;

    /// Cluster label per observation
    fn groups(&mut self) -> Result<Vec<Cluster>>;

    fn compute_expectation(&self) -> Result<Vec<f64>> {
        Err(not_implemented(Self::NAME, "expectation"))
    }

    fn compute_variance(&self) -> Result<Vec<f64>> {
        Err(not_implemented(Self::NAME, "variance"))
    }

    fn n(&self) -> usize {
        self.keys().len()
    }

    fn state(&self) -> StatState {
        self.core().state(self.is_bound())
    }

    fn set_processing_mode(&mut self, mode: ProcessingMode) {
        self.core_mut().set_mode(mode);
    }

    /// Memoized statistic values in key order
    fn stat(&mut self) -> Result<Vec<f64>> {
        if let Some(v) = &self.core().memo.stat {
            return Ok(v.clone());
        }
        let v = self.compute()?;
        self.core_mut().memo.stat = Some(v.clone());
        Ok(v)
    }

    fn expectation(&mut self) -> Result<Vec<f64>> {
        if let Some(v) = &self.core().memo.expectation {
            return Ok(v.clone());
        }
        let v = self.compute_expectation()?;
        self.core_mut().memo.expectation = Some(v.clone());
        Ok(v)
    }

    fn variance(&mut self) -> Result<Vec<f64>> {
        if let Some(v) = &self.core().memo.variance {
            return Ok(v.clone());
        }
        let v = self.compute_variance()?;
        self.core_mut().memo.variance = Some(v.clone());
        Ok(v)
    }

    /// Per-observation z-scores; NaN where the variance is zero
    fn z_score(&mut self) -> Result<Vec<f64>> {
        let stat = self.stat()?;
        let expectation = self.expectation()?;
        let variance = self.variance()?;
        Ok(stat
            .iter()
            .zip(&expectation)
            .zip(&variance)
            .map(|((s, e), v)| if *v > 0.0 { (s - e) / v.sqrt() } else { f64::NAN })
            .collect())
    }

    /// Conditional permutation pseudo p-values in key order
    fn mc(&mut self, permutations: usize, seed: Option<u64>) -> Result<Vec<f64>> {
        validate_permutations(permutations)?;
        if let Some(p) = self.core().cached_p(permutations, seed) {
            return Ok(p);
        }

        let observed = self.stat()?;
        let seed = resolve_seed(seed);
        let mode = self.core().mode();
        debug!(
            statistic = Self::NAME,
            n = self.n(),
            permutations,
            seed,
            ?mode,
            "conditional permutation test"
        );

        let p = local_test(
            &observed,
            self.neighborhood(),
            permutations,
            seed,
            mode,
            |i, substitutes| self.compute_at(i, substitutes),
        )?;

        debug!(statistic = Self::NAME, "conditional permutation test finished");
        self.core_mut().memo.permutation = Some(PermutationRecord {
            permutations,
            seed,
            p: p.clone(),
        });
        Ok(p)
    }

    fn mc_with(&mut self, params: &PermutationParams) -> Result<Vec<f64>> {
        self.mc(params.permutations, params.seed)
    }

    /// `{key, stat, p, group}` for every observation in key order
    fn summary(
        &mut self,
        permutations: usize,
        seed: Option<u64>,
    ) -> Result<Vec<LocalSummary<Self::Key>>> {
        let stat = self.stat()?;
        let p = self.mc(permutations, seed)?;
        let groups = self.groups()?;
        Ok(self
            .keys()
            .iter()
            .zip(stat)
            .zip(p)
            .zip(groups)
            .map(|(((key, stat), p), group)| LocalSummary {
                key: key.clone(),
                stat,
                p,
                group,
            })
            .collect())
    }
}
