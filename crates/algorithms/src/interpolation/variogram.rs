//! Variogram models, empirical variogram and model fitting
//!
//! The semivariance γ(h) measures spatial dissimilarity as a function of
//! separation distance h:
//! ```text
//! γ(h) = (1/2N(h)) Σ [z(xᵢ) - z(xⱼ)]²   for all pairs with |xᵢ-xⱼ| ∈ h±Δh/2
//! ```
//!
//! Kriging evaluates a theoretical [`Variogram`] model; the model can be
//! given directly or fitted to an [`EmpiricalVariogram`].
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use serde::{Deserialize, Serialize};
use gridkit_core::{Error, Result, SamplePoint};

/// Theoretical variogram model shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariogramModel {
    /// γ(h) = c₀ + c·[1.5(h/a) - 0.5(h/a)³] for h ≤ a; c₀+c for h > a
    #[default]
    Spherical,
    /// γ(h) = c₀ + c·[1 - exp(-3h/a)]
    Exponential,
    /// γ(h) = c₀ + c·[1 - exp(-3h²/a²)]
    Gaussian,
    /// γ(h) = c₀ + c·min(h/a, 1)
    Linear,
}

impl VariogramModel {
    pub const ALL: [VariogramModel; 4] = [
        VariogramModel::Spherical,
        VariogramModel::Exponential,
        VariogramModel::Gaussian,
        VariogramModel::Linear,
    ];
}

/// Variogram model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variogram {
    pub model: VariogramModel,
    /// Nugget (c₀): semivariance as h → 0
    pub nugget: f64,
    /// Sill (c₀ + c): semivariance at which the model levels off
    pub sill: f64,
    /// Range (a): distance at which the sill is (practically) reached
    pub range: f64,
}

impl Default for Variogram {
    fn default() -> Self {
        Self {
            model: VariogramModel::Spherical,
            nugget: 0.0,
            sill: 1.0,
            range: 100.0,
        }
    }
}

impl Variogram {
    pub fn new(model: VariogramModel, nugget: f64, sill: f64, range: f64) -> Self {
        Self {
            model,
            nugget,
            sill,
            range,
        }
    }

    /// Partial sill (c = sill - nugget)
    pub fn partial_sill(&self) -> f64 {
        self.sill - self.nugget
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.nugget.is_finite() && self.nugget >= 0.0) {
            return Err(Error::invalid("nugget", self.nugget, "must be finite and >= 0"));
        }
        if !(self.sill.is_finite() && self.sill > 0.0 && self.sill >= self.nugget) {
            return Err(Error::invalid(
                "sill",
                self.sill,
                format!("must be finite, > 0 and >= nugget ({})", self.nugget),
            ));
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(Error::invalid("range", self.range, "must be finite and > 0"));
        }
        Ok(())
    }

    /// Evaluate the model at distance h. γ(0) = 0 by convention.
    #[inline]
    pub fn semivariance(&self, h: f64) -> f64 {
        if h < 1e-15 {
            return 0.0;
        }

        let c0 = self.nugget;
        let c = self.partial_sill();
        let a = self.range;

        match self.model {
            VariogramModel::Spherical => {
                if h >= a {
                    c0 + c
                } else {
                    let hr = h / a;
                    c0 + c * (1.5 * hr - 0.5 * hr * hr * hr)
                }
            }
            VariogramModel::Exponential => c0 + c * (1.0 - (-3.0 * h / a).exp()),
            VariogramModel::Gaussian => c0 + c * (1.0 - (-3.0 * h * h / (a * a)).exp()),
            VariogramModel::Linear => c0 + c * (h / a).min(1.0),
        }
    }
}

/// Empirical variogram: semivariance values at discrete lag distances.
#[derive(Debug, Clone)]
pub struct EmpiricalVariogram {
    /// Lag distances (bin centers)
    pub lags: Vec<f64>,
    /// Semivariance γ(h) at each lag, NaN for empty bins
    pub semivariance: Vec<f64>,
    /// Number of point pairs contributing to each lag bin
    pub pair_counts: Vec<usize>,
}

/// Parameters for empirical variogram computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariogramParams {
    /// Number of lag bins (default 15)
    pub n_lags: usize,
    /// Maximum lag distance. If None, half the max pairwise distance.
    pub max_lag: Option<f64>,
}

impl Default for VariogramParams {
    fn default() -> Self {
        Self {
            n_lags: 15,
            max_lag: None,
        }
    }
}

/// Compute the empirical (experimental) variogram from sample points.
pub fn empirical_variogram(
    points: &[SamplePoint],
    params: VariogramParams,
) -> Result<EmpiricalVariogram> {
    let n = points.len();
    if n < 2 {
        return Err(Error::InsufficientPoints { found: n, required: 2 });
    }
    if params.n_lags == 0 {
        return Err(Error::invalid("n_lags", params.n_lags, "must be > 0"));
    }

    let max_lag = match params.max_lag {
        Some(m) => m,
        None => {
            let mut max_dist = 0.0_f64;
            for i in 0..n {
                for j in (i + 1)..n {
                    max_dist = max_dist.max(points[i].dist(points[j].x, points[j].y));
                }
            }
            max_dist / 2.0
        }
    };

    if !(max_lag > 0.0) {
        return Err(Error::invalid("max_lag", max_lag, "must be > 0"));
    }

    let bin_width = max_lag / params.n_lags as f64;
    let lags: Vec<f64> = (0..params.n_lags)
        .map(|k| (k as f64 + 0.5) * bin_width)
        .collect();
    let mut semivariance = vec![0.0_f64; params.n_lags];
    let mut pair_counts = vec![0_usize; params.n_lags];

    for i in 0..n {
        for j in (i + 1)..n {
            let d = points[i].dist(points[j].x, points[j].y);
            if d > max_lag {
                continue;
            }
            let bin = ((d / bin_width) as usize).min(params.n_lags - 1);
            let dz = points[i].value - points[j].value;
            semivariance[bin] += dz * dz;
            pair_counts[bin] += 1;
        }
    }

    for k in 0..params.n_lags {
        semivariance[k] = if pair_counts[k] > 0 {
            semivariance[k] / (2.0 * pair_counts[k] as f64)
        } else {
            f64::NAN
        };
    }

    Ok(EmpiricalVariogram {
        lags,
        semivariance,
        pair_counts,
    })
}

/// A model fitted to an empirical variogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedVariogram {
    pub variogram: Variogram,
    /// Pair-weighted residual sum of squares (lower = better)
    pub rss: f64,
}

/// Fit a variogram model to an empirical variogram.
///
/// Weighted least squares (weights = pair counts) over a grid search of
/// nugget, sill and range.
pub fn fit_variogram(
    empirical: &EmpiricalVariogram,
    model: VariogramModel,
) -> Result<FittedVariogram> {
    let valid: Vec<(f64, f64, usize)> = empirical
        .lags
        .iter()
        .zip(empirical.semivariance.iter())
        .zip(empirical.pair_counts.iter())
        .filter(|((_, sv), cnt)| !sv.is_nan() && **cnt > 0)
        .map(|((&lag, &sv), &cnt)| (lag, sv, cnt))
        .collect();

    if valid.len() < 3 {
        return Err(Error::Algorithm(
            "Need at least 3 valid lag bins to fit variogram".into(),
        ));
    }

    let max_lag = valid.last().map(|(l, _, _)| *l).unwrap_or(1.0);
    let max_sv = valid.iter().map(|(_, sv, _)| *sv).fold(0.0_f64, f64::max);

    if max_sv <= 0.0 {
        return Err(Error::Algorithm("All semivariance values are zero".into()));
    }

    let (n_nugget, n_sill, n_range) = (10, 10, 20);
    let mut best = FittedVariogram {
        variogram: Variogram::new(model, 0.0, max_sv, max_lag),
        rss: f64::MAX,
    };

    for in_ in 0..=n_nugget {
        let nugget = max_sv * in_ as f64 / (2.0 * n_nugget as f64);
        for is in 1..=n_sill {
            let sill = max_sv * is as f64 / n_sill as f64;
            if sill <= nugget {
                continue;
            }
            for ir in 1..=n_range {
                let range = max_lag * 2.0 * ir as f64 / n_range as f64;
                let trial = Variogram::new(model, nugget, sill, range);

                let rss: f64 = valid
                    .iter()
                    .map(|&(lag, sv, cnt)| {
                        let residual = sv - trial.semivariance(lag);
                        cnt as f64 * residual * residual
                    })
                    .sum();

                if rss < best.rss {
                    best = FittedVariogram {
                        variogram: trial,
                        rss,
                    };
                }
            }
        }
    }

    Ok(best)
}

/// Fit every model shape and return the one with the lowest RSS.
pub fn fit_best_variogram(empirical: &EmpiricalVariogram) -> Result<FittedVariogram> {
    VariogramModel::ALL
        .iter()
        .filter_map(|&model| fit_variogram(empirical, model).ok())
        .min_by(|a, b| a.rss.partial_cmp(&b.rss).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| Error::Algorithm("Could not fit any variogram model".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn generate_spatially_correlated(n: usize, range: f64, seed: u64) -> Vec<SamplePoint> {
        let mut points = Vec::with_capacity(n);
        let mut rng = seed;
        let mut next = || {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (rng >> 33) as f64 / (1u64 << 31) as f64
        };

        for _ in 0..n {
            let x = next() * 100.0;
            let y = next() * 100.0;
            let value = 0.5 * x + 0.3 * y + 10.0 * ((x / range).sin() + (y / range).sin());
            let noise = next() * 2.0 - 1.0;
            points.push(SamplePoint::new(x, y, value + noise));
        }

        points
    }

    #[test]
    fn test_empirical_variogram_basic() {
        let points = generate_spatially_correlated(100, 20.0, 42);
        let result = empirical_variogram(&points, VariogramParams::default()).unwrap();

        assert_eq!(result.lags.len(), 15);
        assert!(result.pair_counts[0] > 0, "First lag should have pairs");

        let valid_sv: Vec<f64> = result
            .semivariance
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        assert!(valid_sv.len() >= 5, "Should have at least 5 valid lags");
        assert!(
            valid_sv[0] < *valid_sv.last().unwrap(),
            "Semivariance should increase: first={:.2}, last={:.2}",
            valid_sv[0],
            valid_sv.last().unwrap()
        );
    }

    #[test]
    fn test_empirical_variogram_too_few() {
        let points = vec![SamplePoint::new(0.0, 0.0, 1.0)];
        assert!(matches!(
            empirical_variogram(&points, VariogramParams::default()),
            Err(Error::InsufficientPoints { found: 1, required: 2 })
        ));
    }

    #[test]
    fn test_fit_each_model() {
        let points = generate_spatially_correlated(200, 15.0, 123);
        let emp = empirical_variogram(&points, VariogramParams::default()).unwrap();

        for model in VariogramModel::ALL {
            let fitted = fit_variogram(&emp, model).unwrap();
            let v = fitted.variogram;
            assert_eq!(v.model, model);
            assert!(v.validate().is_ok(), "{:?}: {:?}", model, v);
            assert!(v.sill > v.nugget, "Sill should exceed nugget");
            assert!(fitted.rss < f64::MAX);
        }
    }

    #[test]
    fn test_fit_best() {
        let points = generate_spatially_correlated(200, 15.0, 101);
        let emp = empirical_variogram(&points, VariogramParams::default()).unwrap();
        let best = fit_best_variogram(&emp).unwrap();

        for model in VariogramModel::ALL {
            let single = fit_variogram(&emp, model).unwrap();
            assert!(best.rss <= single.rss);
        }
    }

    #[test]
    fn test_spherical_evaluation() {
        let model = Variogram::new(VariogramModel::Spherical, 1.0, 10.0, 50.0);

        assert_eq!(model.semivariance(0.0), 0.0);
        assert_relative_eq!(model.semivariance(50.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(model.semivariance(100.0), 10.0, epsilon = 1e-12);

        let mid = model.semivariance(25.0);
        assert!(mid > 1.0 && mid < 10.0, "Mid should be between nugget and sill: {:.2}", mid);
    }

    #[test]
    fn test_exponential_reaches_95_percent_at_range() {
        let model = Variogram::new(VariogramModel::Exponential, 0.0, 10.0, 30.0);
        let at_range = model.semivariance(30.0);
        assert!(at_range > 9.0 && at_range < 10.0, "got {:.2}", at_range);
    }

    #[test]
    fn test_linear_evaluation() {
        let model = Variogram::new(VariogramModel::Linear, 2.0, 12.0, 10.0);
        assert_relative_eq!(model.semivariance(5.0), 7.0);
        assert_relative_eq!(model.semivariance(20.0), 12.0);
    }

    #[test]
    fn test_validation() {
        assert!(Variogram::default().validate().is_ok());
        assert!(Variogram::new(VariogramModel::Gaussian, -1.0, 1.0, 1.0).validate().is_err());
        assert!(Variogram::new(VariogramModel::Gaussian, 2.0, 1.0, 1.0).validate().is_err());
        assert!(Variogram::new(VariogramModel::Gaussian, 0.0, 1.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_zero_sill_rejected() {
        let flat = Variogram::new(VariogramModel::Spherical, 0.0, 0.0, 50.0);
        assert!(matches!(
            flat.validate(),
            Err(Error::InvalidParameter { name: "sill", .. })
        ));
        // Pure nugget is still a valid model
        assert!(Variogram::new(VariogramModel::Spherical, 2.0, 2.0, 50.0).validate().is_ok());
    }
}
