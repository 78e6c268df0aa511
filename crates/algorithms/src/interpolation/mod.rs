//! Spatial interpolation of scattered points
//!
//! Every method implements the same three-step [`Interpolator`] contract:
//! `initialize` once per run (builds search indices, inverts global
//! matrices), `get_value` once per location, `finalize` to release state.
//!
//! - IDW: Inverse Distance Weighting
//! - Ordinary Kriging: BLUE geostatistical interpolation with error variance
//! - Nearest Neighbor: value of the closest sample
//!
//! [`interpolate_grid`] drives an interpolator over every cell of an
//! output grid.

pub mod grid;
mod idw;
pub mod kdtree;
mod kriging;
mod nearest;
pub mod search;
pub mod variogram;
pub mod weighting;

pub use gridkit_core::{PointCollection, SamplePoint};

pub use grid::{interpolate_grid, run_interpolation, ErrorMeasure, GridOutput, GridSpec, RunSummary};
pub use idw::{InverseDistance, IdwParams};
pub use kdtree::{KdTree, NearestResult};
pub use kriging::{KrigingEstimate, KrigingParams, OrdinaryKriging};
pub use nearest::{NearestNeighbor, NearestNeighborParams};
pub use search::{Neighbor, SearchIndex, SearchMode, SearchParams};
pub use variogram::{
    empirical_variogram, fit_best_variogram, fit_variogram, EmpiricalVariogram,
    FittedVariogram, Variogram, VariogramModel, VariogramParams,
};
pub use weighting::{DistanceWeighting, WeightingKernel};

use gridkit_core::Result;
use serde::{Deserialize, Serialize};

/// Estimate at one location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub value: f64,
    /// Estimation variance, for methods that produce one
    pub variance: Option<f64>,
}

impl Estimate {
    pub fn value(value: f64) -> Self {
        Self {
            value,
            variance: None,
        }
    }
}

/// Uniform lifecycle shared by all interpolation methods.
///
/// `get_value` takes `&self` and implementors are `Sync`, so one initialized
/// interpolator can serve many threads at once.
pub trait Interpolator: Sync {
    /// Human-readable method name
    fn name(&self) -> &'static str;

    /// Prepare for queries against `field` of `points`.
    ///
    /// Configuration and construction errors (bad parameters, no valid
    /// points, singular global system) are reported here.
    fn initialize(&mut self, points: &PointCollection, field: usize) -> Result<()>;

    /// Estimate at (x, y). `Ok(None)` means no estimate is defined here.
    fn get_value(&self, x: f64, y: f64) -> Result<Option<Estimate>>;

    /// Release per-run state. Safe to call repeatedly.
    fn finalize(&mut self);

    /// Whether estimates carry a variance
    fn has_variance(&self) -> bool {
        false
    }
}

/// Method selection, e.g. from a JSON or TOML run description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InterpolationConfig {
    InverseDistance(IdwParams),
    OrdinaryKriging(KrigingParams),
    NearestNeighbor(NearestNeighborParams),
}

impl InterpolationConfig {
    /// Construct the configured (uninitialized) interpolator
    pub fn build(&self) -> Estimator {
        match self {
            InterpolationConfig::InverseDistance(p) => Estimator::Idw(InverseDistance::new(*p)),
            InterpolationConfig::OrdinaryKriging(p) => {
                Estimator::Kriging(OrdinaryKriging::new(*p))
            }
            InterpolationConfig::NearestNeighbor(p) => {
                Estimator::Nearest(NearestNeighbor::new(*p))
            }
        }
    }
}

/// Any of the available interpolators
#[derive(Debug)]
pub enum Estimator {
    Idw(InverseDistance),
    Kriging(OrdinaryKriging),
    Nearest(NearestNeighbor),
}

impl Estimator {
    fn inner(&self) -> &dyn Interpolator {
        match self {
            Estimator::Idw(e) => e,
            Estimator::Kriging(e) => e,
            Estimator::Nearest(e) => e,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Interpolator {
        match self {
            Estimator::Idw(e) => e,
            Estimator::Kriging(e) => e,
            Estimator::Nearest(e) => e,
        }
    }
}

impl Interpolator for Estimator {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn initialize(&mut self, points: &PointCollection, field: usize) -> Result<()> {
        self.inner_mut().initialize(points, field)
    }

    fn get_value(&self, x: f64, y: f64) -> Result<Option<Estimate>> {
        self.inner().get_value(x, y)
    }

    fn finalize(&mut self) {
        self.inner_mut().finalize()
    }

    fn has_variance(&self) -> bool {
        self.inner().has_variance()
    }
}
