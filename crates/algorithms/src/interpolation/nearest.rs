//! Nearest Neighbor interpolation
//!
//! Assigns each location the value of the closest sample point.
//! Fast and simple, produces a Voronoi-like tessellation. Equidistant
//! samples resolve to the lowest record index.

use serde::{Deserialize, Serialize};
use gridkit_core::{Error, PointCollection, Result, SamplePoint};

use super::search::{SearchIndex, SearchParams};
use super::{Estimate, Interpolator};

/// Parameters for Nearest Neighbor interpolation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NearestNeighborParams {
    /// Only `mode` and `radius` apply; locations farther than `radius`
    /// from every sample have no value.
    pub search: SearchParams,
}

#[derive(Debug)]
enum Prepared {
    Global(Vec<SamplePoint>),
    Local(SearchIndex),
}

/// Nearest neighbor interpolator.
#[derive(Debug)]
pub struct NearestNeighbor {
    params: NearestNeighborParams,
    state: Option<Prepared>,
}

impl NearestNeighbor {
    pub fn new(params: NearestNeighborParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &NearestNeighborParams {
        &self.params
    }

    fn radius_sq(&self) -> Option<f64> {
        let r = self.params.search.radius;
        (r > 0.0).then_some(r * r)
    }
}

impl Interpolator for NearestNeighbor {
    fn name(&self) -> &'static str {
        "Nearest Neighbour"
    }

    fn initialize(&mut self, points: &PointCollection, field: usize) -> Result<()> {
        let radius = self.params.search.radius;
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(Error::invalid("radius", radius, "must be finite and >= 0"));
        }
        points.check_field(field)?;

        let state = if self.params.search.is_local() {
            Prepared::Local(SearchIndex::create(points, field)?)
        } else {
            let samples: Vec<SamplePoint> = points.samples(field).map(|(_, p)| p).collect();
            if samples.is_empty() {
                return Err(Error::IndexBuild(format!("no valid values in field {}", field)));
            }
            Prepared::Global(samples)
        };

        self.state = Some(state);
        Ok(())
    }

    fn get_value(&self, x: f64, y: f64) -> Result<Option<Estimate>> {
        let state = self.state.as_ref().ok_or(Error::NotInitialized("Nearest Neighbour"))?;

        let found = match state {
            Prepared::Local(index) => index
                .neighbors(x, y, 1, self.params.search.radius)
                .first()
                .map(|n| n.point.value),
            Prepared::Global(samples) => {
                let mut min_dist_sq = f64::MAX;
                let mut nearest_val = None;

                for pt in samples {
                    let dsq = pt.dist_sq(x, y);
                    if dsq < min_dist_sq {
                        min_dist_sq = dsq;
                        nearest_val = Some(pt.value);
                    }
                }

                match self.radius_sq() {
                    Some(max_sq) if min_dist_sq > max_sq => None,
                    _ => nearest_val,
                }
            }
        };

        Ok(found.map(Estimate::value))
    }

    fn finalize(&mut self) {
        if let Some(Prepared::Local(mut index)) = self.state.take() {
            index.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> PointCollection {
        PointCollection::from_samples(
            "z",
            &[
                SamplePoint::new(2.0, 8.0, 10.0), // top-left quadrant
                SamplePoint::new(8.0, 8.0, 20.0), // top-right quadrant
                SamplePoint::new(2.0, 2.0, 30.0), // bottom-left quadrant
                SamplePoint::new(8.0, 2.0, 40.0), // bottom-right quadrant
            ],
        )
    }

    fn engine(search: SearchParams) -> NearestNeighbor {
        let mut nn = NearestNeighbor::new(NearestNeighborParams { search });
        nn.initialize(&sample_points(), 0).unwrap();
        nn
    }

    fn value(nn: &NearestNeighbor, x: f64, y: f64) -> Option<f64> {
        nn.get_value(x, y).unwrap().map(|e| e.value)
    }

    #[test]
    fn test_nearest_voronoi() {
        for search in [SearchParams::global(), SearchParams::local(1, 0.0)] {
            let nn = engine(search);
            assert_eq!(value(&nn, 0.5, 9.5), Some(10.0), "top-left, {:?}", search.mode);
            assert_eq!(value(&nn, 9.5, 0.5), Some(40.0), "bottom-right, {:?}", search.mode);
            assert_eq!(value(&nn, 7.0, 3.0), Some(40.0));
            assert_eq!(value(&nn, 3.0, 7.0), Some(10.0));
        }
    }

    #[test]
    fn test_nearest_tie_takes_first_record() {
        // (5, 5) is equidistant from all four samples
        for search in [SearchParams::global(), SearchParams::local(1, 0.0)] {
            assert_eq!(value(&engine(search), 5.0, 5.0), Some(10.0));
        }
    }

    #[test]
    fn test_nearest_max_radius() {
        for search in [
            SearchParams {
                radius: 1.0,
                ..SearchParams::global()
            },
            SearchParams::local(1, 1.0),
        ] {
            let nn = engine(search);
            assert_eq!(value(&nn, 2.5, 8.0), Some(10.0));
            assert_eq!(value(&nn, 5.0, 5.0), None, "{:?}", search.mode);
        }
    }

    #[test]
    fn test_nearest_lifecycle() {
        let mut nn = NearestNeighbor::new(NearestNeighborParams::default());
        assert!(nn.get_value(0.0, 0.0).is_err());
        assert!(nn.initialize(&PointCollection::new(["z"]), 0).is_err());

        nn.initialize(&sample_points(), 0).unwrap();
        assert!(!nn.has_variance());
        nn.finalize();
        nn.finalize();
        assert!(nn.get_value(0.0, 0.0).is_err());
    }

    #[test]
    fn test_nearest_invalid_radius() {
        let mut nn = NearestNeighbor::new(NearestNeighborParams {
            search: SearchParams::local(1, -1.0),
        });
        assert!(matches!(
            nn.initialize(&sample_points(), 0),
            Err(Error::InvalidParameter { name: "radius", .. })
        ));
    }
}
