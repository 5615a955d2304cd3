//! Global Geary's C

use std::borrow::Cow;

use spatialstats_core::{FieldSource, Key, Result, SparseWeightsMatrix, WeightsMatrix};

use crate::statistics::engine::moments::WeightMoments;
use crate::statistics::engine::variable::{reorder, sum_sq};
use crate::statistics::engine::{not_computable, GlobalStatistic, StatCore, Variable};

/// Σ_i Σ_j w_ij (v_i - v_j)²
fn squared_differences(w: &SparseWeightsMatrix, v: &[f64]) -> Result<f64> {
    let mut total = 0.0;
    for i in 0..w.n() {
        for (j, weight) in w.row(i)? {
            let d = v[i] - v[j];
            total += weight * d * d;
        }
    }
    Ok(total)
}

/// Global Geary's C
///
/// `C = (n - 1) Σ_ij w_ij (z_i - z_j)² / (2 S0 Σ z²)`. Values below 1 indicate
/// positive autocorrelation, above 1 negative.
#[derive(Debug, Clone)]
pub struct Geary<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    x: Variable,
    core: StatCore<f64>,
}

impl<'w, K: Key> Geary<'w, K> {
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

    pub fn set_x(&mut self, x: Vec<f64>) -> Result<()> {
        self.core.bind(&mut self.x, x, self.weights.n())
    }

    pub fn resolve_x<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_x(values)
    }

    pub fn x(&self) -> Result<&[f64]> {
        self.x.values()
    }
}

impl<K: Key> GlobalStatistic for Geary<'_, K> {
    const NAME: &'static str = "Geary's C";

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

        let s0 = self.weights.total_weight();
        let denom = sum_sq(&z);
        if s0 == 0.0 {
            return Err(not_computable(Self::NAME, "weights sum to zero"));
        }
        if denom == 0.0 {
            return Err(not_computable(Self::NAME, "values have zero variance"));
        }

        let n = self.weights.n() as f64;
        Ok((n - 1.0) * squared_differences(self.weights.sparse(), &z)? / (2.0 * s0 * denom))
    }

    fn compute_expectation(&self) -> Result<f64> {
        Ok(1.0)
    }

    /// Variance under randomization
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
        let nf = n as f64;
        let m2 = sum_sq(z) / nf;
        if m2 == 0.0 {
            return Err(not_computable(Self::NAME, "values have zero variance"));
        }
        let m4 = z.iter().map(|v| v.powi(4)).sum::<f64>() / nf;
        let kurtosis = m4 / (m2 * m2);

        let a = (nf - 1.0) * s1 * (nf * nf - 3.0 * nf + 3.0 - (nf - 1.0) * kurtosis);
        let b = 0.25 * (nf - 1.0) * s2 * (nf * nf + 3.0 * nf - 6.0 - (nf * nf - nf + 2.0) * kurtosis);
        let c = s0 * s0 * (nf * nf - 3.0 - (nf - 1.0).powi(2) * kurtosis);
        let d = nf * (nf - 2.0) * (nf - 3.0) * s0 * s0;

        Ok((a - b + c) / d)
    }
}
