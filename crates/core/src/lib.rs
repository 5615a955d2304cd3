//! # spatialstats core
//!
//! Core types for spatial autocorrelation analysis.
//!
//! This crate provides:
//! - `WeightsMatrix<K>`: ordered observation keys plus weighted neighbor rows
//! - `SparseWeightsMatrix`: compressed sparse row kernel (`mulvec`, `dot_row`)
//! - Lag operators: neighbor sum/average and their windowed forms
//! - `FieldSource`: the boundary through which attribute vectors arrive
//!
//! No geometry is computed here; neighbor relations arrive already built.

pub mod error;
pub mod lag;
pub mod source;
pub mod weights;

pub use error::{Error, Result};
pub use source::{FieldSource, MemorySource};
pub use weights::{Key, SparseWeightsMatrix, WeightEntry, WeightsMatrix};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::lag::{neighbor_average, neighbor_sum, window_average, window_sum};
    pub use crate::source::{FieldSource, MemorySource};
    pub use crate::weights::{AsSparse, Key, SparseWeightsMatrix, WeightEntry, WeightsMatrix};
}
