//! Getis-Ord local G and G* statistics

use spatialstats_core::{FieldSource, Key, Result, SparseWeightsMatrix, WeightsMatrix};

use crate::statistics::cluster::Cluster;
use crate::statistics::engine::moments::conditional_moments;
use crate::statistics::engine::{LocalStatistic, StatCore, Variable};

/// Getis-Ord local G (`star = false`) or G* (`star = true`)
///
/// G* sums the windowed neighborhood of each observation, itself included,
/// over the grand total: `G*_i = Σ_j w*_ij x_j / Σ_j x_j`.
/// G uses the row-standardized weights and excludes `x_i` from the
/// denominator: `G_i = Σ_j w'_ij x_j / Σ_{j≠i} x_j`.
///
/// Unless set explicitly, `star` is true when the weights already carry a
/// self weight (`trace(W) > 0`). Observations with a zero denominator get NaN.
#[derive(Debug, Clone)]
pub struct GetisOrd<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    star: bool,
    lag_weights: WeightsMatrix<K>,
    x: Variable,
    total: f64,
    core: StatCore<Vec<f64>>,
}

fn lag_weights_for<K: Key>(weights: &WeightsMatrix<K>, star: bool) -> WeightsMatrix<K> {
    if star {
        weights.window()
    } else {
        weights.standardize()
    }
}

impl<'w, K: Key> GetisOrd<'w, K> {
    /// Detect `star` from the diagonal of `weights`
    pub fn new(weights: &'w WeightsMatrix<K>) -> Self {
        let star = weights.trace() > 0.0;
        Self::with_star(weights, star)
    }

    pub fn with_star(weights: &'w WeightsMatrix<K>, star: bool) -> Self {
        tracing::debug!(star, n = weights.n(), "building Getis-Ord lag weights");
        Self {
            weights,
            star,
            lag_weights: lag_weights_for(weights, star),
            x: Variable::new("x"),
            total: 0.0,
            core: StatCore::new(),
        }
    }

    pub fn with_x(weights: &'w WeightsMatrix<K>, x: Vec<f64>) -> Result<Self> {
        let mut stat = Self::new(weights);
        stat.set_x(x)?;
        Ok(stat)
    }

    pub fn is_star(&self) -> bool {
        self.star
    }

    /// Switch between G and G*, dropping cached results
    pub fn set_star(&mut self, star: bool) {
        if star != self.star {
            self.star = star;
            self.lag_weights = lag_weights_for(self.weights, star);
            self.core.invalidate();
        }
    }

    pub fn set_x(&mut self, x: Vec<f64>) -> Result<()> {
        self.core.bind(&mut self.x, x, self.weights.n())?;
        self.total = self.x.values()?.iter().sum();
        Ok(())
    }

    pub fn resolve_x<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_x(values)
    }

    pub fn x(&self) -> Result<&[f64]> {
        self.x.values()
    }

    /// Windowed weights for G*, row-standardized weights for G
    pub fn lag_weights(&self) -> &WeightsMatrix<K> {
        &self.lag_weights
    }

    fn denominator(&self, x: &[f64], i: usize) -> f64 {
        if self.star {
            self.total
        } else {
            self.total - x[i]
        }
    }

    fn ratio(numerator: f64, denominator: f64) -> f64 {
        if denominator == 0.0 {
            f64::NAN
        } else {
            numerator / denominator
        }
    }
}

impl<K: Key> LocalStatistic for GetisOrd<'_, K> {
    type Key = K;

    const NAME: &'static str = "Getis-Ord G";

    fn keys(&self) -> &[K] {
        self.weights.keys()
    }

    fn is_bound(&self) -> bool {
        self.x.is_bound()
    }

    fn core(&self) -> &StatCore<Vec<f64>> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatCore<Vec<f64>> {
        &mut self.core
    }

    fn neighborhood(&self) -> &SparseWeightsMatrix {
        self.lag_weights.sparse()
    }

    fn compute(&self) -> Result<Vec<f64>> {
        let x = self.x.values()?;
        let lag = self.lag_weights.sparse().mulvec(x)?;
        Ok(lag
            .iter()
            .enumerate()
            .map(|(i, l)| Self::ratio(*l, self.denominator(x, i)))
            .collect())
    }

    fn compute_at(&self, i: usize, substitutes: &[usize]) -> Result<f64> {
        let x = self.x.values()?;
        let w = self.lag_weights.sparse();
        let lag: f64 = w.values()[w.row_range(i)?]
            .iter()
            .zip(substitutes)
            .map(|(weight, &j)| weight * x[j])
            .sum();
        Ok(Self::ratio(lag, self.denominator(x, i)))
    }

    /// Hot spot where `G_i` exceeds its expectation, cold spot otherwise
    fn groups(&mut self) -> Result<Vec<Cluster>> {
        let stat = self.stat()?;
        let expectation = self.expectation()?;
        Ok(stat
            .iter()
            .zip(&expectation)
            .map(|(g, e)| if g > e { Cluster::HotSpot } else { Cluster::ColdSpot })
            .collect())
    }

    fn compute_expectation(&self) -> Result<Vec<f64>> {
        let x = self.x.values()?;
        Ok(conditional_moments(self.lag_weights.sparse(), x)?
            .iter()
            .enumerate()
            .map(|(i, m)| Self::ratio(m.mean, self.denominator(x, i)))
            .collect())
    }

    fn compute_variance(&self) -> Result<Vec<f64>> {
        let x = self.x.values()?;
        Ok(conditional_moments(self.lag_weights.sparse(), x)?
            .iter()
            .enumerate()
            .map(|(i, m)| Self::ratio(m.variance, self.denominator(x, i).powi(2)))
            .collect())
    }
}
