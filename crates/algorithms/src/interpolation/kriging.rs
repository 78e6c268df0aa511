//! Ordinary Kriging interpolation
//!
//! Best Linear Unbiased Estimator (BLUE) for spatial data. Uses a variogram
//! model to compute interpolation weights that minimize estimation variance
//! while satisfying an unbiasedness constraint.
//!
//! The kriging system for n sample points:
//! ```text
//! [ 0       γ(x₁,x₂) ... γ(x₁,xₙ) 1] [λ₁]   [γ(x₁,x₀)]
//! [γ(x₂,x₁)  0       ... γ(x₂,xₙ) 1] [λ₂]   [γ(x₂,x₀)]
//! [  ...                      ...   ] [..] = [   ...   ]
//! [γ(xₙ,x₁) ...              0    1] [λₙ]   [γ(xₙ,x₀)]
//! [  1       1  ...           1    0] [μ ]   [    1    ]
//! ```
//! where γ is the semivariance, x₀ the target location and μ the Lagrange
//! multiplier enforcing Σλᵢ = 1. The matrix W is inverted once (global
//! search) or per location (local search); the weights are then Λ = W⁻¹·G.
//!
//! Estimate and kriging variance:
//! ```text
//! z₀ = Σ λᵢ·zᵢ        σ² = Σ λᵢ·γ(xᵢ,x₀) + μ
//! ```
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use gridkit_core::{Error, PointCollection, Result, SamplePoint};

use super::search::{SearchIndex, SearchParams};
use super::variogram::Variogram;
use super::{Estimate, Interpolator};

/// Parameters for Ordinary Kriging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KrigingParams {
    pub search: SearchParams,
    pub variogram: Variogram,
}

impl Default for KrigingParams {
    fn default() -> Self {
        Self {
            search: SearchParams {
                max_points: 16,
                ..SearchParams::default()
            },
            variogram: Variogram::default(),
        }
    }
}

impl KrigingParams {
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.variogram.validate()
    }
}

/// Kriging estimate and its estimation variance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KrigingEstimate {
    pub value: f64,
    pub variance: f64,
}

impl KrigingEstimate {
    /// Negative or non-finite variance: the variogram model does not fit
    /// the local point configuration.
    pub fn is_suspect(&self) -> bool {
        !(self.variance >= 0.0) || !self.variance.is_finite()
    }
}

impl From<KrigingEstimate> for Estimate {
    fn from(k: KrigingEstimate) -> Self {
        Estimate {
            value: k.value,
            variance: Some(k.variance),
        }
    }
}

#[derive(Debug)]
struct GlobalSystem {
    points: Vec<SamplePoint>,
    /// Inverted (n+1)×(n+1) kriging matrix
    weights: Array2<f64>,
}

#[derive(Debug)]
enum Prepared {
    Global(GlobalSystem),
    Local(SearchIndex),
}

/// Ordinary kriging interpolator.
#[derive(Debug)]
pub struct OrdinaryKriging {
    params: KrigingParams,
    state: Option<Prepared>,
}

impl OrdinaryKriging {
    pub fn new(params: KrigingParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &KrigingParams {
        &self.params
    }

    /// Inverted kriging matrix for `points` under this engine's variogram.
    pub fn get_weights(&self, points: &[SamplePoint]) -> Result<Array2<f64>> {
        kriging_weights(&self.params.variogram, points)
    }

    /// Solve Λ = W⁻¹·G at (x, y); the last entry is the Lagrange multiplier.
    pub fn solve_lambda(&self, points: &[SamplePoint], x: f64, y: f64) -> Result<Array1<f64>> {
        let w = self.get_weights(points)?;
        Ok(w.dot(&self.rhs(points, x, y)))
    }

    /// Estimate at (x, y) with the variance, `Ok(None)` where undefined.
    pub fn estimate(&self, x: f64, y: f64) -> Result<Option<KrigingEstimate>> {
        let state = self.state.as_ref().ok_or(Error::NotInitialized("Ordinary Kriging"))?;

        match state {
            Prepared::Global(system) => Ok(Some(self.apply(&system.points, &system.weights, x, y))),
            Prepared::Local(index) => {
                let search = &self.params.search;
                let points: Vec<SamplePoint> = index
                    .neighbors(x, y, search.max_points, search.radius)
                    .into_iter()
                    .map(|n| n.point)
                    .collect();

                if points.len() < search.min_points {
                    return Ok(None);
                }

                match self.get_weights(&points) {
                    Ok(w) => Ok(Some(self.apply(&points, &w, x, y))),
                    Err(Error::SingularMatrix { size }) => {
                        tracing::debug!("singular {0}x{0} kriging system at ({1}, {2})", size, x, y);
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Right-hand side G: γ(query, pᵢ) followed by the constraint entry 1
    fn rhs(&self, points: &[SamplePoint], x: f64, y: f64) -> Array1<f64> {
        let n = points.len();
        Array1::from_shape_fn(n + 1, |i| {
            if i < n {
                self.params.variogram.semivariance(points[i].dist(x, y))
            } else {
                1.0
            }
        })
    }

    fn apply(&self, points: &[SamplePoint], w: &Array2<f64>, x: f64, y: f64) -> KrigingEstimate {
        let g = self.rhs(points, x, y);
        let lambda = w.dot(&g);

        let value = points
            .iter()
            .zip(lambda.iter())
            .map(|(p, l)| l * p.value)
            .sum();
        let variance = lambda.dot(&g);

        KrigingEstimate { value, variance }
    }
}

impl Interpolator for OrdinaryKriging {
    fn name(&self) -> &'static str {
        "Ordinary Kriging"
    }

    fn initialize(&mut self, points: &PointCollection, field: usize) -> Result<()> {
        self.params.validate()?;
        points.check_field(field)?;

        let state = if self.params.search.is_local() {
            Prepared::Local(SearchIndex::create(points, field)?)
        } else {
            let samples: Vec<SamplePoint> = points.samples(field).map(|(_, p)| p).collect();
            let weights = self.get_weights(&samples)?;
            tracing::debug!("global kriging system inverted for {} points", samples.len());
            Prepared::Global(GlobalSystem {
                points: samples,
                weights,
            })
        };

        self.state = Some(state);
        Ok(())
    }

    fn get_value(&self, x: f64, y: f64) -> Result<Option<Estimate>> {
        Ok(self.estimate(x, y)?.map(Estimate::from))
    }

    fn finalize(&mut self) {
        if let Some(Prepared::Local(mut index)) = self.state.take() {
            index.destroy();
        }
    }

    fn has_variance(&self) -> bool {
        true
    }
}

/// Build the augmented ordinary kriging matrix for `points` and invert it.
///
/// The semivariance block is divided by its largest entry before inversion
/// so the singularity test does not depend on the units of the data. With
/// W = [[Γ, 1], [1ᵀ, 0]] and Γ = s·Γ', the inverse is
/// diag(I, s) · W'⁻¹ · diag(I/s, 1).
pub fn kriging_weights(variogram: &Variogram, points: &[SamplePoint]) -> Result<Array2<f64>> {
    let n = points.len();
    if n < 1 {
        return Err(Error::InsufficientPoints { found: 0, required: 1 });
    }

    let mut w = Array2::<f64>::zeros((n + 1, n + 1));
    for i in 0..n {
        w[[i, n]] = 1.0;
        w[[n, i]] = 1.0;
        for j in (i + 1)..n {
            let g = variogram.semivariance(points[i].dist(points[j].x, points[j].y));
            w[[i, j]] = g;
            w[[j, i]] = g;
        }
    }

    let scale = w
        .slice(s![..n, ..n])
        .iter()
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if !(scale > 0.0 && scale.is_finite()) {
        return invert(w);
    }

    w.slice_mut(s![..n, ..n]).mapv_inplace(|g| g / scale);
    let mut inv = invert(w)?;
    inv.slice_mut(s![..n, ..n]).mapv_inplace(|v| v / scale);
    inv[[n, n]] *= scale;
    Ok(inv)
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Pivots below `1e-12` times the largest absolute entry count as zero.
pub fn invert(mut a: Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n {
        return Err(Error::InvalidDimensions {
            width: a.ncols(),
            height: n,
        });
    }

    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let tolerance = scale * 1e-12;
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        let mut max_val = a[[col, col]].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = a[[row, col]].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if !(max_val > tolerance) {
            return Err(Error::SingularMatrix { size: n });
        }

        if max_row != col {
            for j in 0..n {
                a.swap([col, j], [max_row, j]);
                inv.swap([col, j], [max_row, j]);
            }
        }

        let pivot = a[[col, col]];
        for j in 0..n {
            a[[col, j]] /= pivot;
            inv[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[[row, j]] -= factor * a[[col, j]];
                inv[[row, j]] -= factor * inv[[col, j]];
            }
        }
    }

    Ok(inv)
}
