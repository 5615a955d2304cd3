//! Local multivariate Geary's c

use spatialstats_core::{Error, FieldSource, Key, Result, SparseWeightsMatrix, WeightsMatrix};

use crate::statistics::cluster::Cluster;
use crate::statistics::engine::{LocalStatistic, StatCore, Variable};

/// Local multivariate Geary's c
///
/// `c_i = (1/k) Σ_v Σ_j w_ij (s_vi - s_vj)²` over `k` standardized variables.
/// Permutations move whole observation tuples, so every variable draws the
/// same neighbor substitutes.
#[derive(Debug, Clone)]
pub struct MultivariateGeary<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    variables: Vec<Variable>,
    scaled: Vec<Vec<f64>>,
    core: StatCore<Vec<f64>>,
}

impl<'w, K: Key> MultivariateGeary<'w, K> {
    pub fn new(weights: &'w WeightsMatrix<K>) -> Self {
        Self {
            weights,
            variables: Vec::new(),
            scaled: Vec::new(),
            core: StatCore::new(),
        }
    }

    pub fn with_variables(weights: &'w WeightsMatrix<K>, variables: Vec<Vec<f64>>) -> Result<Self> {
        let mut stat = Self::new(weights);
        stat.set_variables(variables)?;
        Ok(stat)
    }

    /// Bind all variables at once.
    ///
    /// Each must have one value per key and non-zero variance. On failure
    /// the previous variables stay bound.
    pub fn set_variables(&mut self, variables: Vec<Vec<f64>>) -> Result<()> {
        if variables.is_empty() {
            return Err(Error::InvalidParameter {
                name: "variables",
                value: "0".into(),
                reason: "at least one variable is required".into(),
            });
        }

        let n = self.weights.n();
        let mut bound = Vec::with_capacity(variables.len());
        let mut scaled = Vec::with_capacity(variables.len());
        for values in variables {
            let mut var = Variable::new("variables");
            var.bind(values, n)?;
            scaled.push(var.standardized()?);
            bound.push(var);
        }

        self.variables = bound;
        self.scaled = scaled;
        self.core.invalidate();
        Ok(())
    }

    /// Fetch every field from `source` and bind them together
    pub fn resolve_fields<S: FieldSource<K> + ?Sized>(&mut self, source: &S, fields: &[&str]) -> Result<()> {
        let variables = fields
            .iter()
            .map(|field| source.fetch(field, self.weights.keys()))
            .collect::<Result<Vec<_>>>()?;
        self.set_variables(variables)
    }

    /// Number of bound variables
    pub fn k(&self) -> usize {
        self.variables.len()
    }

    fn check_bound(&self) -> Result<()> {
        if self.variables.is_empty() {
            Err(Error::Unbound("variables"))
        } else {
            Ok(())
        }
    }
}

impl<K: Key> LocalStatistic for MultivariateGeary<'_, K> {
    type Key = K;

    const NAME: &'static str = "multivariate Geary's c";

    fn keys(&self) -> &[K] {
        self.weights.keys()
    }

    fn is_bound(&self) -> bool {
        !self.variables.is_empty()
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
        self.check_bound()?;
        let w = self.weights.sparse();
        (0..w.n())
            .map(|i| self.compute_at(i, &w.col_index()[w.row_range(i)?]))
            .collect()
    }

    fn compute_at(&self, i: usize, substitutes: &[usize]) -> Result<f64> {
        self.check_bound()?;
        let w = self.weights.sparse();
        let weights = &w.values()[w.row_range(i)?];
        let total: f64 = self
            .scaled
            .iter()
            .map(|s| {
                weights
                    .iter()
                    .zip(substitutes)
                    .map(|(weight, &j)| weight * (s[i] - s[j]).powi(2))
                    .sum::<f64>()
            })
            .sum();
        Ok(total / self.scaled.len() as f64)
    }

    /// Positive association below the mean of `c`, negative otherwise
    fn groups(&mut self) -> Result<Vec<Cluster>> {
        let c = self.stat()?;
        let mean = c.iter().sum::<f64>() / c.len().max(1) as f64;
        Ok(c.iter()
            .map(|&ci| if ci < mean { Cluster::Positive } else { Cluster::Negative })
            .collect())
    }
}
