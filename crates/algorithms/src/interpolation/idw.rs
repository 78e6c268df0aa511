//! Inverse Distance Weighting (IDW) interpolation
//!
//! Estimates values at unknown locations as a weighted average of nearby
//! sample points, where weights are inversely proportional to distance
//! raised to a power parameter:
//!
//! ```text
//! z(x,y) = Σ(wi * zi) / Σ(wi)
//! where wi = 1 / d(x,y, xi,yi)^p
//! ```
//!
//! A location that coincides with one or more samples takes the mean of
//! those samples; all other points are ignored there.
//! Weights that underflow to zero or overflow are recomputed in log space
//! relative to the largest one.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use serde::{Deserialize, Serialize};
use gridkit_core::{Error, PointCollection, Result, SamplePoint};

use super::search::{SearchIndex, SearchParams};
use super::weighting::DistanceWeighting;
use super::{Estimate, Interpolator};

/// Parameters for IDW interpolation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwParams {
    pub search: SearchParams,
    pub weighting: DistanceWeighting,
}

impl IdwParams {
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.weighting.validate()
    }
}

#[derive(Debug)]
enum Prepared {
    /// Valid samples in record order
    Global(Vec<SamplePoint>),
    Local(SearchIndex),
}

/// Inverse distance weighted interpolator.
#[derive(Debug)]
pub struct InverseDistance {
    params: IdwParams,
    state: Option<Prepared>,
}

impl InverseDistance {
    pub fn new(params: IdwParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &IdwParams {
        &self.params
    }

    /// Weighted mean over neighbours already sorted by ascending distance
    fn local_value(&self, index: &SearchIndex, x: f64, y: f64) -> Option<f64> {
        let search = &self.params.search;
        let found = index.neighbors(x, y, search.max_points, search.radius);

        if found.len() < search.min_points {
            return None;
        }

        let mut acc = WeightedMean::default();
        for n in &found {
            if n.distance > 0.0 {
                acc.add(n.point.value, self.params.weighting.weight(n.distance));
            } else {
                return mean(found.iter().take_while(|m| m.distance <= 0.0).map(|m| m.point.value));
            }
        }
        acc.mean().or_else(|| {
            rescaled_mean(
                &self.params.weighting,
                found.iter().map(|n| (n.distance, n.point.value)),
            )
        })
    }

    fn global_value(&self, samples: &[SamplePoint], x: f64, y: f64) -> Option<f64> {
        let mut acc = WeightedMean::default();

        for (i, p) in samples.iter().enumerate() {
            let d = p.dist(x, y);
            if d > 0.0 {
                acc.add(p.value, self.params.weighting.weight(d));
            } else {
                return mean(
                    samples[i..]
                        .iter()
                        .filter(|q| q.is_at(x, y))
                        .map(|q| q.value),
                );
            }
        }
        acc.mean().or_else(|| {
            rescaled_mean(
                &self.params.weighting,
                samples.iter().map(|p| (p.dist(x, y), p.value)),
            )
        })
    }
}

impl Interpolator for InverseDistance {
    fn name(&self) -> &'static str {
        "Inverse Distance Weighted"
    }

    fn initialize(&mut self, points: &PointCollection, field: usize) -> Result<()> {
        self.params.validate()?;
        points.check_field(field)?;

        let state = if self.params.search.is_local() {
            Prepared::Local(SearchIndex::create(points, field)?)
        } else {
            let samples: Vec<SamplePoint> = points.samples(field).map(|(_, p)| p).collect();
            if samples.is_empty() {
                return Err(Error::IndexBuild(format!("no valid values in field {}", field)));
            }
            tracing::debug!("IDW initialized: {} samples, global search", samples.len());
            Prepared::Global(samples)
        };

        self.state = Some(state);
        Ok(())
    }

    fn get_value(&self, x: f64, y: f64) -> Result<Option<Estimate>> {
        let state = self.state.as_ref().ok_or(Error::NotInitialized("IDW"))?;

        let value = match state {
            Prepared::Local(index) => self.local_value(index, x, y),
            Prepared::Global(samples) => self.global_value(samples, x, y),
        };
        Ok(value.map(Estimate::value))
    }

    fn finalize(&mut self) {
        if let Some(Prepared::Local(mut index)) = self.state.take() {
            index.destroy();
        }
    }
}

#[derive(Default)]
struct WeightedMean {
    sum_w: f64,
    sum_wz: f64,
}

impl WeightedMean {
    #[inline]
    fn add(&mut self, value: f64, weight: f64) {
        self.sum_w += weight;
        self.sum_wz += weight * value;
    }

    /// `None` when the weights underflowed to zero or overflowed
    fn mean(&self) -> Option<f64> {
        let m = self.sum_wz / self.sum_w;
        (self.sum_w > 0.0 && m.is_finite()).then_some(m)
    }
}

/// Weighted mean of `(distance, value)` pairs with every weight taken
/// relative to the largest one, computed in log space.
fn rescaled_mean<I>(weighting: &DistanceWeighting, pairs: I) -> Option<f64>
where
    I: Iterator<Item = (f64, f64)> + Clone,
{
    let top = pairs
        .clone()
        .map(|(d, _)| weighting.log_weight(d))
        .fold(f64::NEG_INFINITY, f64::max);
    if !top.is_finite() {
        return None;
    }

    let mut acc = WeightedMean::default();
    for (d, z) in pairs {
        acc.add(z, (weighting.log_weight(d) - top).exp());
    }
    acc.mean()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (n, sum) = values.fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::weighting::WeightingKernel;
    use approx::assert_relative_eq;

    fn square() -> PointCollection {
        PointCollection::from_samples(
            "z",
            &[
                SamplePoint::new(0.0, 0.0, 10.0),
                SamplePoint::new(10.0, 0.0, 20.0),
                SamplePoint::new(0.0, 10.0, 30.0),
                SamplePoint::new(10.0, 10.0, 40.0),
            ],
        )
    }

    fn engine(search: SearchParams, power: f64, points: &PointCollection) -> InverseDistance {
        let mut idw = InverseDistance::new(IdwParams {
            search,
            weighting: DistanceWeighting::idw(power),
        });
        idw.initialize(points, 0).unwrap();
        idw
    }

    fn value(idw: &InverseDistance, x: f64, y: f64) -> Option<f64> {
        idw.get_value(x, y).unwrap().map(|e| e.value)
    }

    #[test]
    fn test_idw_square_centre_is_mean() {
        let pts = square();
        for search in [SearchParams::global(), SearchParams::local(4, 0.0)] {
            let idw = engine(search, 2.0, &pts);
            assert_relative_eq!(value(&idw, 5.0, 5.0).unwrap(), 25.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_idw_exact_at_sample_independent_of_power() {
        let pts = square();
        for power in [0.5, 1.0, 2.0, 6.0] {
            for search in [SearchParams::global(), SearchParams::local(4, 0.0)] {
                let idw = engine(search, power, &pts);
                assert_eq!(value(&idw, 10.0, 0.0), Some(20.0), "power {}", power);
            }
        }
    }

    #[test]
    fn test_idw_coincident_points_averaged() {
        let mut pts = square();
        pts.push(5.0, 5.0, vec![5.0]).unwrap();
        pts.push(5.0, 5.0, vec![15.0]).unwrap();

        let global = engine(SearchParams::global(), 2.0, &pts);
        assert_eq!(value(&global, 5.0, 5.0), Some(10.0));

        let local = engine(SearchParams::local(6, 0.0), 2.0, &pts);
        assert_eq!(value(&local, 5.0, 5.0), Some(10.0));
    }

    #[test]
    fn test_idw_coincident_point_late_in_scan() {
        // The coincident sample is last in record order; earlier weights are discarded
        let mut pts = square();
        pts.push(2.0, 3.0, vec![99.0]).unwrap();
        let idw = engine(SearchParams::global(), 2.0, &pts);
        assert_eq!(value(&idw, 2.0, 3.0), Some(99.0));
    }

    #[test]
    fn test_idw_bounded_by_sample_range() {
        let mut pts = PointCollection::new(["z"]);
        let mut rng = 7u64;
        for _ in 0..60 {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let x = (rng >> 33) as f64 / (1u64 << 31) as f64 * 100.0;
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let y = (rng >> 33) as f64 / (1u64 << 31) as f64 * 100.0;
            pts.push(x, y, vec![(x * 0.1).sin() * 50.0 + y]).unwrap();
        }
        let (lo, hi) = pts
            .samples(0)
            .fold((f64::MAX, f64::MIN), |(lo, hi), (_, p)| (lo.min(p.value), hi.max(p.value)));

        let idw = engine(SearchParams::global(), 2.0, &pts);
        for i in 0..20 {
            for j in 0..20 {
                let v = value(&idw, i as f64 * 5.3 - 3.0, j as f64 * 5.1 - 2.0).unwrap();
                assert!(v >= lo - 1e-9 && v <= hi + 1e-9, "{} outside [{}, {}]", v, lo, hi);
            }
        }
    }

    #[test]
    fn test_idw_min_points_not_met() {
        let pts = square();
        let idw = engine(
            SearchParams {
                min_points: 2,
                ..SearchParams::local(4, 3.0)
            },
            2.0,
            &pts,
        );
        // Only (0,0) lies within 3 of (1,1)
        assert_eq!(value(&idw, 1.0, 1.0), None);
        // Nothing within 3 of the centre
        assert_eq!(value(&idw, 5.0, 5.0), None);
    }

    #[test]
    fn test_idw_max_points_limits_neighbours() {
        let pts = square();
        let idw = engine(SearchParams::local(1, 0.0), 2.0, &pts);
        assert_eq!(value(&idw, 1.0, 2.0), Some(10.0));
    }

    #[test]
    fn test_idw_nodata_excluded() {
        let mut pts = square().with_nodata(-9999.0);
        pts.push(5.0, 5.0, vec![-9999.0]).unwrap();
        let idw = engine(SearchParams::global(), 2.0, &pts);
        assert_relative_eq!(value(&idw, 5.0, 5.0).unwrap(), 25.0, epsilon = 1e-12);
    }

    #[test]
    fn test_idw_gaussian_kernel() {
        let pts = square();
        let mut idw = InverseDistance::new(IdwParams {
            search: SearchParams::global(),
            weighting: DistanceWeighting::gaussian(3.0),
        });
        idw.initialize(&pts, 0).unwrap();
        let v = value(&idw, 1.0, 1.0).unwrap();
        assert!(v > 10.0 && v < 12.0, "near (0,0) should be close to 10, got {}", v);
        assert_eq!(idw.params().weighting.kernel, WeightingKernel::Gaussian);
    }

    #[test]
    fn test_idw_far_query_underflowing_weights() {
        let pts = square();
        let mut gauss = InverseDistance::new(IdwParams {
            search: SearchParams::global(),
            weighting: DistanceWeighting::gaussian(1.0),
        });
        gauss.initialize(&pts, 0).unwrap();
        // exp(-0.5·d²) is zero for every sample; (10,10) dominates
        assert_relative_eq!(value(&gauss, 100.0, 100.0).unwrap(), 40.0, epsilon = 1e-9);

        for search in [SearchParams::global(), SearchParams::local(4, 0.0)] {
            let idw = engine(search, 400.0, &pts);
            assert_relative_eq!(value(&idw, 5.0, 5.0).unwrap(), 25.0, epsilon = 1e-12);
            assert_relative_eq!(value(&idw, 50.0, 50.0).unwrap(), 40.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_idw_overflowing_weight_near_sample() {
        for search in [SearchParams::global(), SearchParams::local(4, 0.0)] {
            let idw = engine(search, 200.0, &square());
            // 0.001^-200 is infinite
            assert_relative_eq!(value(&idw, 0.001, 0.0).unwrap(), 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_idw_skips_non_finite_coordinates() {
        let mut samples: Vec<SamplePoint> = square().samples(0).map(|(_, p)| p).collect();
        samples.push(SamplePoint::new(f64::NAN, 1.0, 1000.0));
        let pts = PointCollection::from_samples("z", &samples);

        for search in [SearchParams::global(), SearchParams::local(5, 0.0)] {
            let idw = engine(search, 2.0, &pts);
            assert_relative_eq!(value(&idw, 5.0, 5.0).unwrap(), 25.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_idw_lifecycle() {
        let pts = square();
        let mut idw = InverseDistance::new(IdwParams::default());
        assert!(matches!(idw.get_value(0.0, 0.0), Err(Error::NotInitialized(_))));

        idw.initialize(&pts, 0).unwrap();
        assert!(idw.get_value(1.0, 1.0).unwrap().is_some());

        idw.finalize();
        idw.finalize();
        assert!(idw.get_value(1.0, 1.0).is_err());
    }

    #[test]
    fn test_idw_initialize_errors() {
        let mut bad_power = InverseDistance::new(IdwParams {
            weighting: DistanceWeighting::idw(0.0),
            ..Default::default()
        });
        assert!(matches!(
            bad_power.initialize(&square(), 0),
            Err(Error::InvalidParameter { name: "power", .. })
        ));

        let mut idw = InverseDistance::new(IdwParams::default());
        assert!(idw.initialize(&PointCollection::new(["z"]), 0).is_err());
        assert!(idw.initialize(&square(), 1).is_err());
    }
}
