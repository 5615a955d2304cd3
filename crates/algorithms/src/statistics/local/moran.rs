//! Local Moran's I (LISA)

use spatialstats_core::lag::neighbor_average;
use spatialstats_core::{FieldSource, Key, Result, SparseWeightsMatrix, WeightsMatrix};

use crate::statistics::cluster::Cluster;
use crate::statistics::engine::moments::conditional_moments;
use crate::statistics::engine::{LocalStatistic, StatCore, Variable};

/// Local Moran's I
///
/// `I_i = (z_i / m2_i) Σ_j w_ij z_j` where `m2_i = Σ_{j≠i} z_j² / (n - 1)`.
/// Normalizing by the other observations keeps `m2_i` fixed under the
/// conditional permutation, so the analytic moments are exact for the test.
///
/// Observations whose peers are all equal (`m2_i = 0`) get 0.
#[derive(Debug, Clone)]
pub struct LocalMoran<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    x: Variable,
    m2: Vec<f64>,
    core: StatCore<Vec<f64>>,
}

impl<'w, K: Key> LocalMoran<'w, K> {
    pub fn new(weights: &'w WeightsMatrix<K>) -> Self {
        Self {
            weights,
            x: Variable::new("x"),
            m2: Vec::new(),
            core: StatCore::new(),
        }
    }

    pub fn with_x(weights: &'w WeightsMatrix<K>, x: Vec<f64>) -> Result<Self> {
        let mut stat = Self::new(weights);
        stat.set_x(x)?;
        Ok(stat)
    }

    pub fn set_x(&mut self, x: Vec<f64>) -> Result<()> {
        self.core.bind(&mut self.x, x, self.weights.n())?;

        let z = self.x.demeaned()?;
        let total: f64 = z.iter().map(|v| v * v).sum();
        let others = z.len().saturating_sub(1).max(1) as f64;
        self.m2 = z.iter().map(|v| (total - v * v).max(0.0) / others).collect();
        Ok(())
    }

    pub fn resolve_x<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_x(values)
    }

    pub fn x(&self) -> Result<&[f64]> {
        self.x.values()
    }

    /// `z_i / m2_i`, or 0 when the peers carry no variation
    fn scale(&self, z: &[f64], i: usize) -> f64 {
        if self.m2[i] > 0.0 {
            z[i] / self.m2[i]
        } else {
            0.0
        }
    }
}

impl<K: Key> LocalStatistic for LocalMoran<'_, K> {
    type Key = K;

    const NAME: &'static str = "local Moran's I";

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
        self.weights.sparse()
    }

    fn compute(&self) -> Result<Vec<f64>> {
        let z = self.x.demeaned()?;
        let lag = self.weights.sparse().mulvec(z)?;
        Ok(lag
            .iter()
            .enumerate()
            .map(|(i, l)| self.scale(z, i) * l)
            .collect())
    }

    fn compute_at(&self, i: usize, substitutes: &[usize]) -> Result<f64> {
        let z = self.x.demeaned()?;
        let w = self.weights.sparse();
        let lag: f64 = w.values()[w.row_range(i)?]
            .iter()
            .zip(substitutes)
            .map(|(weight, &j)| weight * z[j])
            .sum();
        Ok(self.scale(z, i) * lag)
    }

    /// Moran scatterplot quadrant of `(z_i, neighbor average of z)`
    fn groups(&mut self) -> Result<Vec<Cluster>> {
        let z = self.x.demeaned()?;
        let lag = neighbor_average(self.weights, z)?;
        Ok(z.iter().zip(&lag).map(|(&v, &l)| Cluster::quadrant(v, l)).collect())
    }

    fn compute_expectation(&self) -> Result<Vec<f64>> {
        let z = self.x.demeaned()?;
        Ok(conditional_moments(self.weights.sparse(), z)?
            .iter()
            .enumerate()
            .map(|(i, m)| self.scale(z, i) * m.mean)
            .collect())
    }

    fn compute_variance(&self) -> Result<Vec<f64>> {
        let z = self.x.demeaned()?;
        Ok(conditional_moments(self.weights.sparse(), z)?
            .iter()
            .enumerate()
            .map(|(i, m)| self.scale(z, i).powi(2) * m.variance)
            .collect())
    }
}
