//! Error types for spatialstats

use thiserror::Error;

/// Main error type for spatialstats operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Dimension mismatch: expected length {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index out of range: {index} not in [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Row count mismatch: declared {declared} rows but found {keys} keys")]
    RowCountMismatch { declared: usize, keys: usize },

    #[error("Unknown neighbor {neighbor} in row {key}")]
    UnknownNeighbor { key: String, neighbor: String },

    #[error("Unknown key {0}")]
    UnknownKey(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("{operation} is not implemented for {statistic}")]
    NotImplemented {
        statistic: &'static str,
        operation: &'static str,
    },

    #[error("{statistic}: {reason}")]
    NotComputable {
        statistic: &'static str,
        reason: String,
    },

    #[error("Variable {0} is not bound")]
    Unbound(&'static str),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for spatialstats operations
pub type Result<T> = std::result::Result<T, Error>;
