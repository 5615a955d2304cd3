//! # spatialstats parallel
//!
//! Execution strategies for index-addressed work.
//!
//! Permutation tests split into independent units (one per draw, or one per
//! observation). This crate runs those units sequentially, on rayon's global
//! pool, or on a dedicated pool, and always returns results in index order.
//! Without the `parallel` feature every mode runs sequentially.

pub mod strategy;

pub use strategy::{num_threads, ParallelStrategy, ProcessingMode};
