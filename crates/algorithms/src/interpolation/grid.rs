//! Grid driver
//!
//! Evaluates an initialized [`Interpolator`] at every cell centre of an
//! output grid. Rows are independent and run through a
//! [`ProcessingMode`]; the [`CancelToken`] is polled before each row.
//! Cells without an estimate, and rows skipped after cancellation, stay
//! NaN.

use std::time::Instant;

use gridkit_core::{Error, GeoTransform, PointCollection, Raster, Result};
use gridkit_parallel::{CancelToken, ParallelStrategy, ProcessingMode};

use super::Interpolator;

/// Content of the error raster for methods that report a variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMeasure {
    #[default]
    Variance,
    /// Square root of the variance; negative variances become no-data
    StandardDeviation,
}

/// Output grid geometry and execution settings
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub error_measure: ErrorMeasure,
    pub mode: ProcessingMode,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            rows,
            cols,
            transform,
            error_measure: ErrorMeasure::default(),
            mode: ProcessingMode::default(),
        }
    }

    /// Grid of `cell_size` cells whose lower-left corner is (x_min, y_min)
    pub fn from_extent(x_min: f64, y_min: f64, cell_size: f64, rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, GeoTransform::from_extent(x_min, y_min, cell_size, rows))
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_error_measure(mut self, measure: ErrorMeasure) -> Self {
        self.error_measure = measure;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::InvalidDimensions {
                width: self.cols,
                height: self.rows,
            });
        }
        let size = self.transform.cell_size();
        if !(size.is_finite() && size > 0.0) {
            return Err(Error::invalid("cell_size", size, "must be finite and > 0"));
        }
        Ok(())
    }
}

/// Counters for one grid run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Cells that received an estimate
    pub filled: usize,
    /// Evaluated cells without an estimate
    pub no_data: usize,
    pub rows_done: usize,
    pub cancelled: bool,
    /// Cells whose kriging variance came out negative
    pub negative_variance: usize,
}

/// Result of a grid run
#[derive(Debug, Clone)]
pub struct GridOutput {
    pub values: Raster,
    /// Present when the interpolator reports a variance
    pub variance: Option<Raster>,
    pub summary: RunSummary,
}

struct RowResult {
    values: Vec<f64>,
    variance: Vec<f64>,
    filled: usize,
    negative: usize,
}

fn compute_row<I>(engine: &I, grid: &GridSpec, row: usize, with_variance: bool) -> Result<RowResult>
where
    I: Interpolator + ?Sized,
{
    let mut out = RowResult {
        values: vec![f64::NAN; grid.cols],
        variance: if with_variance { vec![f64::NAN; grid.cols] } else { Vec::new() },
        filled: 0,
        negative: 0,
    };

    for col in 0..grid.cols {
        let (x, y) = grid.transform.pixel_to_geo(col, row);
        let Some(estimate) = engine.get_value(x, y)? else {
            continue;
        };

        out.values[col] = estimate.value;
        out.filled += 1;

        if let (true, Some(v)) = (with_variance, estimate.variance) {
            if v < 0.0 {
                out.negative += 1;
            }
            out.variance[col] = match grid.error_measure {
                ErrorMeasure::Variance => v,
                ErrorMeasure::StandardDeviation if v >= 0.0 => v.sqrt(),
                ErrorMeasure::StandardDeviation => f64::NAN,
            };
        }
    }

    Ok(out)
}

/// Evaluate `engine` at every cell centre of `grid`.
///
/// The engine must already be initialized. The first query error aborts
/// the run. Cancellation is not an error: the output keeps every row
/// finished before the token was observed and `summary.cancelled` is set.
pub fn interpolate_grid<I>(engine: &I, grid: &GridSpec, cancel: &CancelToken) -> Result<GridOutput>
where
    I: Interpolator + ?Sized,
{
    grid.validate()?;

    let (rows, cols) = (grid.rows, grid.cols);
    let with_variance = engine.has_variance();
    tracing::info!(
        "{}: interpolating {}x{} grid on {} threads",
        engine.name(),
        rows,
        cols,
        grid.mode.threads()
    );
    let start = Instant::now();

    let results = grid
        .mode
        .par_map_cancellable(0..rows, cancel, |row| compute_row(engine, grid, row, with_variance));

    let mut values = vec![f64::NAN; rows * cols];
    let mut variance = if with_variance { vec![f64::NAN; rows * cols] } else { Vec::new() };
    let mut summary = RunSummary::default();

    for (row, result) in results.into_iter().enumerate() {
        let Some(result) = result else {
            summary.cancelled = true;
            continue;
        };
        let r = result?;

        let offset = row * cols;
        values[offset..offset + cols].copy_from_slice(&r.values);
        if with_variance {
            variance[offset..offset + cols].copy_from_slice(&r.variance);
        }
        summary.filled += r.filled;
        summary.no_data += cols - r.filled;
        summary.negative_variance += r.negative;
        summary.rows_done += 1;
    }

    if summary.negative_variance > 0 {
        tracing::warn!(
            "{}: negative variance in {} cells, check the variogram model",
            engine.name(),
            summary.negative_variance
        );
    }
    if summary.cancelled {
        tracing::warn!("{}: cancelled after {} of {} rows", engine.name(), summary.rows_done, rows);
    } else {
        tracing::info!(
            "{}: {} cells filled, {} without estimate in {:.2?}",
            engine.name(),
            summary.filled,
            summary.no_data,
            start.elapsed()
        );
    }

    let mut values = Raster::from_vec(values, rows, cols)?;
    values.set_transform(grid.transform);
    let variance = if with_variance {
        let mut raster = Raster::from_vec(variance, rows, cols)?;
        raster.set_transform(grid.transform);
        Some(raster)
    } else {
        None
    };

    Ok(GridOutput {
        values,
        variance,
        summary,
    })
}

/// Full run: initialize `engine` on `field`, fill the grid, finalize.
///
/// The engine is finalized whether or not the run succeeds.
pub fn run_interpolation<I>(
    engine: &mut I,
    points: &PointCollection,
    field: usize,
    grid: &GridSpec,
    cancel: &CancelToken,
) -> Result<GridOutput>
where
    I: Interpolator + ?Sized,
{
    engine.initialize(points, field)?;
    let output = interpolate_grid(&*engine, grid, cancel);
    engine.finalize();
    output
}
