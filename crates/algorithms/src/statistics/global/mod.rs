//! Global statistics: one value summarizing the whole dataset
//!
//! - **Moran**: Moran's I with Cliff–Ord analytic inference
//! - **Geary**: Geary's C
//! - **BivariateMoran**: cross-correlation of x with the lag of y

mod bivariate_moran;
mod geary;
mod moran;

pub use bivariate_moran::BivariateMoran;
pub use geary::Geary;
pub use moran::Moran;
