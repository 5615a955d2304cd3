//! Spatial autocorrelation statistics
//!
//! - **engine**: variable binding, memoization, analytic and permutation inference
//! - **global**: Moran's I, Geary's C, bivariate Moran's I
//! - **local**: LISA statistics and their cluster labels

pub mod cluster;
pub mod engine;
pub mod global;
pub mod local;

pub use cluster::Cluster;
pub use engine::{
    GlobalStatistic, GlobalSummary, LocalStatistic, LocalSummary, PermutationParams, StatState,
    DEFAULT_PERMUTATIONS,
};
pub use global::{BivariateMoran, Geary, Moran};
pub use local::{GetisOrd, LocalBivariateMoran, LocalGeary, LocalMoran, MultivariateGeary};
