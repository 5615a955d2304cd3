//! Local bivariate Moran's I

use spatialstats_core::lag::neighbor_average;
use spatialstats_core::{Error, FieldSource, Key, Result, SparseWeightsMatrix, WeightsMatrix};

use crate::statistics::cluster::Cluster;
use crate::statistics::engine::{LocalStatistic, StatCore, Variable};

/// Local bivariate Moran's I
///
/// `I_i = sx_i Σ_j w_ij sy_j` on standardized variables (`s = z / sd`).
/// The conditional permutation draws `y` values for the neighbors and keeps
/// `x_i` fixed. Standardization fails for a constant variable, which surfaces
/// as `NotComputable` on the first computation.
#[derive(Debug, Clone)]
pub struct LocalBivariateMoran<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    x: Variable,
    y: Variable,
    sx: Result<Vec<f64>>,
    sy: Result<Vec<f64>>,
    core: StatCore<Vec<f64>>,
}

impl<'w, K: Key> LocalBivariateMoran<'w, K> {
    pub fn new(weights: &'w WeightsMatrix<K>) -> Self {
        Self {
            weights,
            x: Variable::new("x"),
            y: Variable::new("y"),
            sx: Err(Error::Unbound("x")),
            sy: Err(Error::Unbound("y")),
            core: StatCore::new(),
        }
    }

    pub fn with_xy(weights: &'w WeightsMatrix<K>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let mut stat = Self::new(weights);
        stat.set_x(x)?;
        stat.set_y(y)?;
        Ok(stat)
    }

    pub fn set_x(&mut self, x: Vec<f64>) -> Result<()> {
        self.core.bind(&mut self.x, x, self.weights.n())?;
        self.sx = self.x.standardized();
        Ok(())
    }

    pub fn set_y(&mut self, y: Vec<f64>) -> Result<()> {
        self.core.bind(&mut self.y, y, self.weights.n())?;
        self.sy = self.y.standardized();
        Ok(())
    }

    pub fn resolve_x<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_x(values)
    }

    pub fn resolve_y<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_y(values)
    }

    fn scaled(&self) -> Result<(&[f64], &[f64])> {
        let sx = self.sx.as_deref().map_err(Clone::clone)?;
        let sy = self.sy.as_deref().map_err(Clone::clone)?;
        Ok((sx, sy))
    }
}

impl<K: Key> LocalStatistic for LocalBivariateMoran<'_, K> {
    type Key = K;

    const NAME: &'static str = "local bivariate Moran's I";

    fn keys(&self) -> &[K] {
        self.weights.keys()
    }

    fn is_bound(&self) -> bool {
        self.x.is_bound() && self.y.is_bound()
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
        let (sx, sy) = self.scaled()?;
        let lag = self.weights.sparse().mulvec(sy)?;
        Ok(sx.iter().zip(&lag).map(|(a, l)| a * l).collect())
    }

    fn compute_at(&self, i: usize, substitutes: &[usize]) -> Result<f64> {
        let (sx, sy) = self.scaled()?;
        let w = self.weights.sparse();
        let lag: f64 = w.values()[w.row_range(i)?]
            .iter()
            .zip(substitutes)
            .map(|(weight, &j)| weight * sy[j])
            .sum();
        Ok(sx[i] * lag)
    }

    /// Quadrant of `(sx_i, neighbor average of sy)`
    fn groups(&mut self) -> Result<Vec<Cluster>> {
        let (sx, sy) = self.scaled()?;
        let lag = neighbor_average(self.weights, sy)?;
        Ok(sx.iter().zip(&lag).map(|(&v, &l)| Cluster::quadrant(v, l)).collect())
    }
}
