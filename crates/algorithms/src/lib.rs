//! # gridkit algorithms
//!
//! Interpolation of scattered point samples onto regular grids.
//!
//! ## Available Methods
//!
//! - **IDW**: inverse distance weighting with pluggable distance kernels
//! - **Ordinary Kriging**: variogram-based BLUE with estimation variance
//! - **Nearest Neighbour**: value of the closest sample
//!
//! All methods share a k-d tree [`SearchIndex`](interpolation::SearchIndex)
//! for local neighbourhoods and run through the same grid driver.

pub mod interpolation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::interpolation::{
        interpolate_grid, run_interpolation, DistanceWeighting, Estimate, Estimator, GridOutput,
        GridSpec, IdwParams, InterpolationConfig, Interpolator, InverseDistance, KrigingParams,
        NearestNeighbor, NearestNeighborParams, OrdinaryKriging, SearchMode, SearchParams,
        Variogram, VariogramModel,
    };
    pub use gridkit_core::prelude::*;
    pub use gridkit_parallel::{CancelToken, ProcessingMode};
}
