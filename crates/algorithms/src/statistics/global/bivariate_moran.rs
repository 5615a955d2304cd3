//! Global bivariate Moran's I

use std::borrow::Cow;

use spatialstats_core::lag::neighbor_average;
use spatialstats_core::{FieldSource, Key, Result, WeightsMatrix};

use crate::statistics::engine::variable::{dot, reorder, sum_sq};
use crate::statistics::engine::{GlobalStatistic, StatCore, Variable};

/// Global bivariate Moran's I
///
/// Correlation between `x` and the spatial lag of `y`:
/// `I_B = Σ zx_i lag_i / sqrt(Σ zx² Σ zy²)` with `lag` the neighbor average
/// of the demeaned `y`. Permutation tests reorder `y` and keep `x` fixed.
/// No closed-form moments are provided.
#[derive(Debug, Clone)]
pub struct BivariateMoran<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    x: Variable,
    y: Variable,
    core: StatCore<f64>,
}

impl<'w, K: Key> BivariateMoran<'w, K> {
    pub fn new(weights: &'w WeightsMatrix<K>) -> Self {
        Self {
            weights,
            x: Variable::new("x"),
            y: Variable::new("y"),
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
        self.core.bind(&mut self.x, x, self.weights.n())
    }

    pub fn set_y(&mut self, y: Vec<f64>) -> Result<()> {
        self.core.bind(&mut self.y, y, self.weights.n())
    }

    pub fn resolve_x<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_x(values)
    }

    pub fn resolve_y<S: FieldSource<K> + ?Sized>(&mut self, source: &S, field: &str) -> Result<()> {
        let values = source.fetch(field, self.weights.keys())?;
        self.set_y(values)
    }

    pub fn x(&self) -> Result<&[f64]> {
        self.x.values()
    }

    pub fn y(&self) -> Result<&[f64]> {
        self.y.values()
    }
}

impl<K: Key> GlobalStatistic for BivariateMoran<'_, K> {
    const NAME: &'static str = "bivariate Moran's I";

    fn n(&self) -> usize {
        self.weights.n()
    }

    fn is_bound(&self) -> bool {
        self.x.is_bound() && self.y.is_bound()
    }

    fn core(&self) -> &StatCore<f64> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatCore<f64> {
        &mut self.core
    }

    fn compute(&self, order: Option<&[usize]>) -> Result<f64> {
        let zx = self.x.demeaned()?;
        let zy = self.y.demeaned()?;
        let zy: Cow<'_, [f64]> = match order {
            Some(order) => Cow::Owned(reorder(zy, order)),
            None => Cow::Borrowed(zy),
        };

        let denom = (sum_sq(zx) * sum_sq(&zy)).sqrt();
        if denom == 0.0 {
            return Ok(0.0);
        }
        let lag = neighbor_average(self.weights, &zy)?;
        Ok(dot(zx, &lag) / denom)
    }
}
