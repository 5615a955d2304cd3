//! Local Geary's c

use spatialstats_core::lag::neighbor_average;
use spatialstats_core::{FieldSource, Key, Result, SparseWeightsMatrix, WeightsMatrix};

use crate::statistics::cluster::Cluster;
use crate::statistics::engine::variable::sum_sq;
use crate::statistics::engine::{not_computable, LocalStatistic, StatCore, Variable};

/// Local Geary's c
///
/// `c_i = Σ_j w_ij (z_i - z_j)² / m2` with `m2 = Σ z² / n`. Small values mean
/// an observation resembles its neighbors.
#[derive(Debug, Clone)]
pub struct LocalGeary<'w, K: Key> {
    weights: &'w WeightsMatrix<K>,
    x: Variable,
    core: StatCore<Vec<f64>>,
}

impl<'w, K: Key> LocalGeary<'w, K> {
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

    fn m2(&self, z: &[f64]) -> Result<f64> {
        let m2 = sum_sq(z) / z.len() as f64;
        if m2 > 0.0 {
            Ok(m2)
        } else {
            Err(not_computable(Self::NAME, "values have zero variance"))
        }
    }
}

impl<K: Key> LocalStatistic for LocalGeary<'_, K> {
    type Key = K;

    const NAME: &'static str = "local Geary's c";

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
        let m2 = self.m2(z)?;
        let w = self.weights.sparse();
        (0..w.n())
            .map(|i| {
                w.row(i)
                    .map(|row| row.map(|(j, weight)| weight * (z[i] - z[j]).powi(2)).sum::<f64>())
                    .map(|s| s / m2)
            })
            .collect()
    }

    fn compute_at(&self, i: usize, substitutes: &[usize]) -> Result<f64> {
        let z = self.x.demeaned()?;
        let m2 = self.m2(z)?;
        let w = self.weights.sparse();
        let s: f64 = w.values()[w.row_range(i)?]
            .iter()
            .zip(substitutes)
            .map(|(weight, &j)| weight * (z[i] - z[j]).powi(2))
            .sum();
        Ok(s / m2)
    }

    /// Below-average `c_i` is positive association, split into HH / LL by
    /// the signs of `z_i` and its neighbor average; the rest is negative.
    fn groups(&mut self) -> Result<Vec<Cluster>> {
        let c = self.stat()?;
        let z = self.x.demeaned()?;
        let lag = neighbor_average(self.weights, z)?;
        let mean = c.iter().sum::<f64>() / c.len().max(1) as f64;

        Ok(c.iter()
            .zip(z.iter().zip(&lag))
            .map(|(&ci, (&zi, &li))| {
                if ci >= mean {
                    Cluster::Negative
                } else if zi > 0.0 && li > 0.0 {
                    Cluster::HighHigh
                } else if zi < 0.0 && li < 0.0 {
                    Cluster::LowLow
                } else {
                    Cluster::Other
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use spatialstats_core::{Error, WeightEntry};

    fn path(n: usize) -> WeightsMatrix<usize> {
        let rows = (0..n)
            .map(|i| {
                let mut neighbors = Vec::new();
                if i > 0 {
                    neighbors.push(WeightEntry::new(i - 1, 1.0));
                }
                if i + 1 < n {
                    neighbors.push(WeightEntry::new(i + 1, 1.0));
                }
                (i, neighbors)
            })
            .collect();
        WeightsMatrix::from_ordered_rows(rows).unwrap()
    }

    #[test]
    fn test_local_geary_values() {
        let w = path(4);
        let mut geary = LocalGeary::with_x(&w, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        // m2 = 5 / 4; each unit step contributes 1
        let c = geary.stat().unwrap();
        assert_relative_eq!(c[0], 1.0 / 1.25);
        assert_relative_eq!(c[1], 2.0 / 1.25);
        assert_relative_eq!(c[3], 1.0 / 1.25);
    }

    #[test]
    fn test_local_geary_groups() {
        // two plateaus joined by one jump
        let w = path(6);
        let mut geary = LocalGeary::with_x(&w, vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0]).unwrap();
        let groups = geary.groups().unwrap();
        assert_eq!(groups[0], Cluster::LowLow);
        assert_eq!(groups[2], Cluster::Negative);
        assert_eq!(groups[3], Cluster::Negative);
        assert_eq!(groups[5], Cluster::HighHigh);
    }

    #[test]
    fn test_local_geary_mixed_signs_are_other() {
        // star around 0: z_0 > 0 but its neighbors average below zero
        let w = WeightsMatrix::from_ordered_rows(vec![
            (0, vec![WeightEntry::new(1, 1.0), WeightEntry::new(2, 1.0)]),
            (1, vec![WeightEntry::new(0, 1.0)]),
            (2, vec![WeightEntry::new(0, 1.0)]),
            (3, vec![WeightEntry::new(4, 1.0)]),
            (4, vec![WeightEntry::new(3, 1.0)]),
        ])
        .unwrap();
        let mut geary = LocalGeary::with_x(&w, vec![1.1, 0.9, -0.2, 10.0, -10.0]).unwrap();
        let groups = geary.groups().unwrap();
        assert_eq!(groups[0], Cluster::Other);
        assert_eq!(groups[3], Cluster::Negative);
    }

    #[test]
    fn test_local_geary_no_closed_form() {
        let w = path(4);
        let mut geary = LocalGeary::with_x(&w, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(geary.expectation(), Err(Error::NotImplemented { .. })));
    }

    #[test]
    fn test_local_geary_constant() {
        let w = path(4);
        let mut geary = LocalGeary::with_x(&w, vec![1.0; 4]).unwrap();
        assert!(matches!(geary.stat(), Err(Error::NotComputable { .. })));
    }
}
