//! Global Moran's I

use std::borrow::Cow;

use spatialstats_core::lag::neighbor_average;
use spatialstats_core::{FieldSource, Key, Result, WeightsMatrix};

use crate::statistics::engine::moments::WeightMoments;
use crate::statistics::engine::variable::{dot, reorder, sum_sq};
use crate::statistics::engine::{not_computable, GlobalStatistic, StatCore, Variable};

/// Global Moran's I
///
/// `I = Σ z_i lag_i / Σ z_i²` where `lag` is the neighbor average of the
/// demeaned values. The classical interpretation assumes row-standardized
/// weights; other weights give a generalized statistic and are not adjusted.
///
/// # Example
///
/// ```ignore
/// let w = weights.standardize();
/// let mut moran = Moran::with_x(&w, values)?;
/// let i = moran.stat()?;
/// let p = moran.mc(999, Some(42))?;
/// ```
#[derive(Debug, Clone)]
pub struct Moran<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    x: Variable,
    core: StatCore<f64>,
}

impl<'w, K: Key> Moran<'w, K> {
    pub fn new(weights: &'w WeightsMatrix<K>) -> Self {
        Self {
            weights,
            x: Variable::new("x"),
            core: StatCore::new(),
        }
    }

    pub fn with_x(weights: &'w WeightsMatrix<K>, x: Vec<f64>) -> Result<Self> {
        let mut stat = Self::new(weights);
        stat.set_x(x)?;
        Ok(stat)
    }

    /// Bind new values, dropping every cached result
    pub fn set_x(&mut self, x: Vec<f64>) -> Result<()> {
        self.core.bind(&mut self.x, x, self.weights.n())
    }

    /// Fetch `field` from `source` and bind it
    pub fn resolve_x<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_x(values)
    }

    pub fn x(&self) -> Result<&[f64]> {
        self.x.values()
    }

    /// Demeaned values
    pub fn z(&self) -> Result<&[f64]> {
        self.x.demeaned()
    }

    pub fn weights(&self) -> &WeightsMatrix<K> {
        self.weights
    }
}

impl<K: Key> GlobalStatistic for Moran<'_, K> {
    const NAME: &'static str = "Moran's I";

    fn n(&self) -> usize {
        self.weights.n()
    }

    fn is_bound(&self) -> bool {
        self.x.is_bound()
    }

    fn core(&self) -> &StatCore<f64> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatCore<f64> {
        &mut self.core
    }

    fn compute(&self, order: Option<&[usize]>) -> Result<f64> {
        let z = self.x.demeaned()?;
        let z: Cow<'_, [f64]> = match order {
            Some(order) => Cow::Owned(reorder(z, order)),
            None => Cow::Borrowed(z),
        };

        let denom = sum_sq(&z);
        if denom == 0.0 {
            // constant vector: no deviation to correlate
            return Ok(0.0);
        }
        let lag = neighbor_average(self.weights, &z)?;
        Ok(dot(&z, &lag) / denom)
    }

    fn compute_expectation(&self) -> Result<f64> {
        let n = self.weights.n();
        if n < 2 {
            return Err(not_computable(Self::NAME, "expectation needs at least 2 observations"));
        }
        Ok(-1.0 / (n as f64 - 1.0))
    }

    /// Cliff–Ord variance under randomization
    fn compute_variance(&self) -> Result<f64> {
        let z = self.x.demeaned()?;
        let n = self.weights.n();
        if n < 4 {
            return Err(not_computable(Self::NAME, "variance needs at least 4 observations"));
        }

        let WeightMoments { s0, s1, s2 } = WeightMoments::from_dense(&self.weights.dense());
        if s0 == 0.0 {
            return Err(not_computable(Self::NAME, "weights sum to zero"));
        }
        let m2 = sum_sq(z) / n as f64;
        if m2 == 0.0 {
            return Err(not_computable(Self::NAME, "values have zero variance"));
        }
        let m4 = z.iter().map(|v| v.powi(4)).sum::<f64>() / n as f64;

        let nf = n as f64;
        let s3 = m4 / (m2 * m2);
        let s4 = (nf * nf - 3.0 * nf + 3.0) * s1 - nf * s2 + 3.0 * s0 * s0;
        let s5 = (nf * nf - nf) * s1 - 2.0 * nf * s2 + 6.0 * s0 * s0;
        let expectation = self.compute_expectation()?;

        Ok((nf * s4 - s3 * s5) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0) * s0 * s0)
            - expectation * expectation)
    }
}
