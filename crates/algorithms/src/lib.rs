//! # spatialstats algorithms
//!
//! Spatial autocorrelation statistics over a [`WeightsMatrix`].
//!
//! ## Available statistics
//!
//! - **global**: Moran's I, Geary's C, bivariate Moran's I
//! - **local**: local Moran's I, Getis-Ord G / G*, local Geary's c,
//!   local bivariate Moran's I, multivariate Geary's c
//!
//! Every statistic binds its input vectors, memoizes its results, and offers
//! analytic inference where a closed form exists plus seeded Monte Carlo
//! permutation tests.
//!
//! [`WeightsMatrix`]: spatialstats_core::WeightsMatrix

pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::statistics::{
        BivariateMoran, Cluster, Geary, GetisOrd, GlobalStatistic, GlobalSummary,
        LocalBivariateMoran, LocalGeary, LocalMoran, LocalStatistic, LocalSummary, Moran,
        MultivariateGeary, PermutationParams, StatState, DEFAULT_PERMUTATIONS,
    };
    pub use spatialstats_core::prelude::*;
    pub use spatialstats_parallel::ProcessingMode;
}
