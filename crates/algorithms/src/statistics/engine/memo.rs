//! Cached results and the statistic lifecycle

use spatialstats_core::Result;
use spatialstats_parallel::ProcessingMode;

use super::variable::Variable;

/// Lifecycle of a statistic instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatState {
    /// No input vector bound yet
    Unbound,
    /// Input bound, nothing computed
    Bound,
    /// Statistic value cached
    Computed,
    /// Analytic variance cached
    InferenceReady,
    /// Permutation p-values cached
    PermutationTested,
}

/// p-values of the last permutation run and the parameters that produced them
#[derive(Debug, Clone)]
pub(crate) struct PermutationRecord<T> {
    pub permutations: usize,
    pub seed: u64,
    pub p: T,
}

/// Memoized results of one statistic instance.
///
/// Every slot is derived from the bound variables; rebinding clears them all.
#[derive(Debug, Clone)]
pub(crate) struct Memo<T> {
    pub stat: Option<T>,
    pub expectation: Option<T>,
    pub variance: Option<T>,
    pub permutation: Option<PermutationRecord<T>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            stat: None,
            expectation: None,
            variance: None,
            permutation: None,
        }
    }
}

/// State shared by every statistic: the memo and the execution mode
#[derive(Debug, Clone, Default)]
pub struct StatCore<T> {
    pub(crate) memo: Memo<T>,
    pub(crate) mode: ProcessingMode,
}

impl<T: Clone> StatCore<T> {
    pub fn new() -> Self {
        Self {
            memo: Memo::default(),
            mode: ProcessingMode::default(),
        }
    }

    /// Bind `values` to `var` and drop every cached result.
    ///
    /// Nothing is invalidated when the bind itself fails.
    pub fn bind(&mut self, var: &mut Variable, values: Vec<f64>, n: usize) -> Result<()> {
        var.bind(values, n)?;
        self.invalidate();
        Ok(())
    }

    pub fn invalidate(&mut self) {
        tracing::trace!("invalidating cached statistic results");
        self.memo = Memo::default();
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ProcessingMode) {
        self.mode = mode;
    }

    pub fn state(&self, bound: bool) -> StatState {
        if !bound {
            StatState::Unbound
        } else if self.memo.permutation.is_some() {
            StatState::PermutationTested
        } else if self.memo.variance.is_some() {
            StatState::InferenceReady
        } else if self.memo.stat.is_some() {
            StatState::Computed
        } else {
            StatState::Bound
        }
    }

    /// Cached p-values for `(permutations, seed)`, if that exact run happened
    pub(crate) fn cached_p(&self, permutations: usize, seed: Option<u64>) -> Option<T> {
        let seed = seed?;
        self.memo
            .permutation
            .as_ref()
            .filter(|r| r.permutations == permutations && r.seed == seed)
            .map(|r| r.p.clone())
    }
}
