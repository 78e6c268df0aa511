//! Output grid structures

mod geotransform;
mod grid;

pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
