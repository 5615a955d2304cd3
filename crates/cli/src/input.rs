//! JSON inputs: the weights file and the attribute table
//!
//! Weights: `{"key": [{"id": neighbor, "weight": w}, ...], ...}`. Key order in
//! the file is the observation order. Neighbor ids may be strings or numbers
//! and are normalized to strings.
//!
//! Values: `{"field": {"key": value, ...}, ...}`.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use spatialstats_core::{MemorySource, WeightEntry, WeightsMatrix};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_key(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Read a weights matrix keyed by strings
pub fn read_weights(path: &Path) -> Result<WeightsMatrix<String>> {
    let raw: Map<String, Value> = serde_json::from_reader(open(path)?)
        .with_context(|| format!("Failed to parse weights JSON {}", path.display()))?;

    let rows = raw
        .into_iter()
        .map(|(key, value)| {
            let entries: Vec<WeightEntry<RawId>> = serde_json::from_value(value)
                .with_context(|| format!("Invalid neighbor list for key {}", key))?;
            let entries = entries
                .into_iter()
                .map(|e| WeightEntry::new(e.id.into_key(), e.weight))
                .collect();
            Ok((key, entries))
        })
        .collect::<Result<Vec<_>>>()?;

    WeightsMatrix::from_ordered_rows(rows).context("Invalid weights")
}

/// Read an attribute table into an in-memory field source
pub fn read_values(path: &Path) -> Result<MemorySource<String>> {
    let raw: HashMap<String, HashMap<String, f64>> = serde_json::from_reader(open(path)?)
        .with_context(|| format!("Failed to parse values JSON {}", path.display()))?;

    let mut source = MemorySource::new();
    for (field, column) in raw {
        source.insert_field(field, column);
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spatialstats_core::{Error, FieldSource};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_weights_numeric_ids() {
        let file = write_json(
            r#"{
                "1": [{"id": 2, "weight": 1.0}, {"id": 4, "weight": 1.0}],
                "2": [{"id": 1, "weight": 1.0}],
                "3": [{"id": "4", "weight": 1.0}],
                "4": [{"id": 1, "weight": 1.0}, {"id": 3, "weight": 1.0}]
            }"#,
        );
        let w = read_weights(file.path()).unwrap();
        assert_eq!(w.keys(), &["1", "2", "3", "4"]);
        assert_eq!(w.neighbors(0).unwrap(), &[(1, 1.0), (3, 1.0)]);
        assert_eq!(w.neighbors(2).unwrap(), &[(3, 1.0)]);
    }

    #[test]
    fn test_read_weights_keeps_file_order() {
        let file = write_json(r#"{"b": [{"id": "a", "weight": 2.0}], "a": []}"#);
        let w = read_weights(file.path()).unwrap();
        assert_eq!(w.keys(), &["b", "a"]);
        assert_eq!(w.total_weight(), 2.0);
    }

    #[test]
    fn test_read_weights_unknown_neighbor() {
        let file = write_json(r#"{"a": [{"id": "z", "weight": 1.0}]}"#);
        let err = read_weights(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnknownNeighbor { .. })
        ));
    }

    #[test]
    fn test_read_weights_malformed() {
        let file = write_json(r#"{"a": [{"id": "a"}]}"#);
        let err = read_weights(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid neighbor list"));
    }

    #[test]
    fn test_read_values() {
        let file = write_json(r#"{"pop": {"a": 1.5, "b": 2.5}, "area": {"a": 3, "b": 4}}"#);
        let source = read_values(file.path()).unwrap();
        let keys = vec!["b".to_string(), "a".to_string()];
        assert_eq!(source.fetch("pop", &keys).unwrap(), vec![2.5, 1.5]);
        assert_eq!(source.fetch("area", &keys).unwrap(), vec![4.0, 3.0]);
        assert!(source.fetch("income", &keys).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = read_values(Path::new("/nonexistent/values.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
