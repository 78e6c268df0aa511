//! # gridkit core
//!
//! Core types shared by the gridkit interpolation engines.
//!
//! This crate provides:
//! - `PointCollection` / `SamplePoint`: scattered input samples with attribute fields
//! - `Raster`: georeferenced output grid (NaN = no-data)
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Error` / `Result`: the error type used across the workspace

pub mod error;
pub mod points;
pub mod raster;

pub use error::{Error, Result};
pub use points::{PointCollection, PointRecord, SamplePoint};
pub use raster::{GeoTransform, Raster, RasterStatistics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::points::{PointCollection, SamplePoint};
    pub use crate::raster::{GeoTransform, Raster};
}
