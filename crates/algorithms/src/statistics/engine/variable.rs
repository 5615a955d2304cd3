//! Bound observation vectors

use spatialstats_core::{Error, FieldSource, Key, Result};

/// A numeric vector aligned to the weights keys, plus its demeaned form.
///
/// Starts unbound; [`bind`](Variable::bind) or [`resolve`](Variable::resolve)
/// validates the length and recomputes `z = x - mean(x)`. A failed bind
/// leaves the previous values in place.
#[derive(Debug, Clone)]
pub struct Variable {
    label: &'static str,
    values: Option<Vec<f64>>,
    demeaned: Vec<f64>,
}

impl Variable {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            values: None,
            demeaned: Vec::new(),
        }
    }

    /// Bind explicit values; `values.len()` must equal `n`
    pub fn bind(&mut self, values: Vec<f64>, n: usize) -> Result<()> {
        if values.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: values.len(),
            });
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter {
                name: self.label,
                value: bad.to_string(),
                reason: "values must be finite".into(),
            });
        }

        let mean = values.iter().sum::<f64>() / n.max(1) as f64;
        self.demeaned = values.iter().map(|v| v - mean).collect();
        self.values = Some(values);
        Ok(())
    }

    /// Fetch `field` from `source` for `keys` and bind it
    pub fn resolve<K, S>(&mut self, source: &S, field: &str, keys: &[K]) -> Result<()>
    where
        K: Key,
        S: FieldSource<K> + ?Sized,
    {
        let values = source.fetch(field, keys)?;
        self.bind(values, keys.len())
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_bound(&self) -> bool {
        self.values.is_some()
    }

    /// Raw values
    pub fn values(&self) -> Result<&[f64]> {
        self.values.as_deref().ok_or(Error::Unbound(self.label))
    }

    /// Values minus their mean
    pub fn demeaned(&self) -> Result<&[f64]> {
        self.values()?;
        Ok(&self.demeaned)
    }

    /// Demeaned values divided by their population standard deviation.
    ///
    /// Fails for a constant vector.
    pub fn standardized(&self) -> Result<Vec<f64>> {
        let z = self.demeaned()?;
        let sd = (sum_sq(z) / z.len() as f64).sqrt();
        if sd == 0.0 || !sd.is_finite() {
            return Err(Error::NotComputable {
                statistic: self.label,
                reason: "variable has zero variance".into(),
            });
        }
        Ok(z.iter().map(|v| v / sd).collect())
    }
}

/// Σ v²
pub fn sum_sq(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Σ a_i b_i
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `out[i] = values[order[i]]`
pub fn reorder(values: &[f64], order: &[usize]) -> Vec<f64> {
    order.iter().map(|&j| values[j]).collect()
}
