//! Local indicators of spatial association: one value per observation
//!
//! - **LocalMoran**: local Moran's I with quadrant clusters
//! - **GetisOrd**: G / G* hot and cold spots
//! - **LocalGeary**: local Geary's c
//! - **LocalBivariateMoran**: local cross-correlation of x with the lag of y
//! - **MultivariateGeary**: Geary's c over several standardized variables

mod bivariate_moran;
mod geary;
mod getis_ord;
mod moran;
mod multivariate_geary;

pub use bivariate_moran::LocalBivariateMoran;
pub use geary::LocalGeary;
pub use getis_ord::GetisOrd;
pub use moran::LocalMoran;
pub use multivariate_geary::MultivariateGeary;
