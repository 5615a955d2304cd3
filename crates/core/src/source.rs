//! Data-fetch boundary
//!
//! Statistics never read attribute data themselves: they ask a
//! [`FieldSource`] for one field, aligned to the weights matrix keys, and
//! validate what comes back.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::weights::Key;

/// Supplies numeric attribute vectors for a set of observations.
///
/// Implementations return exactly one value per key, in the order of `keys`.
/// The call is synchronous and returns the whole vector; the caller checks
/// the length and rejects mismatches.
pub trait FieldSource<K: Key> {
    fn fetch(&self, field: &str, keys: &[K]) -> Result<Vec<f64>>;
}

/// In-memory field source: `field -> key -> value`
#[derive(Debug, Clone, Default)]
pub struct MemorySource<K: Key> {
    fields: HashMap<String, HashMap<K, f64>>,
}

impl<K: Key> MemorySource<K> {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Add (or replace) a field from `(key, value)` pairs
    pub fn insert_field<I>(&mut self, field: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        self.fields.insert(field.into(), values.into_iter().collect());
    }

    /// Builder-style [`insert_field`](Self::insert_field)
    pub fn with_field<I>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        self.insert_field(field, values);
        self
    }

    /// Names of the stored fields
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl<K: Key> FieldSource<K> for MemorySource<K> {
    fn fetch(&self, field: &str, keys: &[K]) -> Result<Vec<f64>> {
        let column = self
            .fields
            .get(field)
            .ok_or_else(|| Error::UnknownField(field.to_string()))?;
        keys.iter()
            .map(|key| {
                column
                    .get(key)
                    .copied()
                    .ok_or_else(|| Error::UnknownKey(format!("{:?}", key)))
            })
            .collect()
    }
}

impl<K: Key, S: FieldSource<K> + ?Sized> FieldSource<K> for &S {
    fn fetch(&self, field: &str, keys: &[K]) -> Result<Vec<f64>> {
        (**self).fetch(field, keys)
    }
}
