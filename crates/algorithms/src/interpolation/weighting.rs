//! Distance weighting functions
//!
//! Converts a distance into a non-negative interpolation weight:
//!
//! ```text
//! inverse distance:  w(d) = 1 / (d + o)^p     o = 1 with offset, else 0
//! exponential:       w(d) = exp(-d / b)
//! gaussian:          w(d) = exp(-0.5 · (d / b)²)
//! ```
//!
//! where `p` is the power and `b` the bandwidth.

use serde::{Deserialize, Serialize};
use gridkit_core::{Error, Result};

/// Weighting kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingKernel {
    /// Every point weighs 1 (plain mean)
    None,
    #[default]
    InverseDistance,
    Exponential,
    Gaussian,
}

/// Distance weighting configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceWeighting {
    pub kernel: WeightingKernel,
    /// Inverse distance exponent (default 2.0)
    pub power: f64,
    /// Add 1 to the distance before exponentiation
    pub offset: bool,
    /// Kernel width for exponential and gaussian weighting
    pub bandwidth: f64,
}

impl Default for DistanceWeighting {
    fn default() -> Self {
        Self {
            kernel: WeightingKernel::InverseDistance,
            power: 2.0,
            offset: false,
            bandwidth: 1.0,
        }
    }
}

impl DistanceWeighting {
    /// Inverse distance weighting with the given power
    pub fn idw(power: f64) -> Self {
        Self {
            power,
            ..Default::default()
        }
    }

    pub fn exponential(bandwidth: f64) -> Self {
        Self {
            kernel: WeightingKernel::Exponential,
            bandwidth,
            ..Default::default()
        }
    }

    pub fn gaussian(bandwidth: f64) -> Self {
        Self {
            kernel: WeightingKernel::Gaussian,
            bandwidth,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.kernel {
            WeightingKernel::InverseDistance => {
                if !(self.power.is_finite() && self.power > 0.0) {
                    return Err(Error::invalid("power", self.power, "must be finite and > 0"));
                }
            }
            WeightingKernel::Exponential | WeightingKernel::Gaussian => {
                if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
                    return Err(Error::invalid(
                        "bandwidth",
                        self.bandwidth,
                        "must be finite and > 0",
                    ));
                }
            }
            WeightingKernel::None => {}
        }
        Ok(())
    }

    /// Weight for a point at `distance`.
    ///
    /// Inverse distance weighting without offset is undefined at zero;
    /// callers average coincident points instead of weighting them.
    #[inline]
    pub fn weight(&self, distance: f64) -> f64 {
        match self.kernel {
            WeightingKernel::None => 1.0,
            WeightingKernel::InverseDistance => {
                if self.offset {
                    (1.0 + distance).powf(-self.power)
                } else {
                    debug_assert!(distance > 0.0, "zero distance passed to inverse distance weight");
                    distance.powf(-self.power)
                }
            }
            WeightingKernel::Exponential => (-distance / self.bandwidth).exp(),
            WeightingKernel::Gaussian => {
                let r = distance / self.bandwidth;
                (-0.5 * r * r).exp()
            }
        }
    }

    /// Natural logarithm of [`weight`](Self::weight), finite where the
    /// weight itself under- or overflows.
    #[inline]
    pub fn log_weight(&self, distance: f64) -> f64 {
        match self.kernel {
            WeightingKernel::None => 0.0,
            WeightingKernel::InverseDistance => {
                if self.offset {
                    -self.power * distance.ln_1p()
                } else {
                    -self.power * distance.ln()
                }
            }
            WeightingKernel::Exponential => -distance / self.bandwidth,
            WeightingKernel::Gaussian => {
                let r = distance / self.bandwidth;
                -0.5 * r * r
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_idw_weight() {
        let w = DistanceWeighting::idw(2.0);
        assert_relative_eq!(w.weight(2.0), 0.25);
        assert_relative_eq!(w.weight(0.5), 4.0);
    }

    #[test]
    fn test_idw_offset() {
        let w = DistanceWeighting {
            offset: true,
            ..DistanceWeighting::idw(1.0)
        };
        assert_relative_eq!(w.weight(0.0), 1.0);
        assert_relative_eq!(w.weight(3.0), 0.25);
    }

    #[test]
    fn test_weights_strictly_decreasing_and_positive() {
        let kernels = [
            DistanceWeighting::idw(1.0),
            DistanceWeighting::idw(3.5),
            DistanceWeighting::exponential(10.0),
            DistanceWeighting::gaussian(10.0),
        ];
        for k in kernels {
            let mut last = f64::INFINITY;
            for i in 1..50 {
                let w = k.weight(i as f64 * 0.7);
                assert!(w > 0.0, "{:?} not positive at {}", k.kernel, i);
                assert!(w < last, "{:?} not decreasing at {}", k.kernel, i);
                last = w;
            }
        }
    }

    #[test]
    fn test_kernel_shapes() {
        assert_relative_eq!(DistanceWeighting::exponential(2.0).weight(2.0), (-1.0f64).exp());
        assert_relative_eq!(DistanceWeighting::gaussian(2.0).weight(2.0), (-0.5f64).exp());
        let none = DistanceWeighting {
            kernel: WeightingKernel::None,
            ..Default::default()
        };
        assert_eq!(none.weight(123.0), 1.0);
    }

    #[test]
    fn test_log_weight_matches_weight() {
        let kernels = [
            DistanceWeighting::idw(2.5),
            DistanceWeighting {
                offset: true,
                ..DistanceWeighting::idw(1.5)
            },
            DistanceWeighting::exponential(4.0),
            DistanceWeighting::gaussian(4.0),
            DistanceWeighting {
                kernel: WeightingKernel::None,
                ..Default::default()
            },
        ];
        for k in kernels {
            for d in [0.3, 1.0, 7.5, 20.0] {
                assert_relative_eq!(k.log_weight(d), k.weight(d).ln(), epsilon = 1e-12);
            }
        }

        // Finite where the weight itself is zero
        let far = DistanceWeighting::gaussian(1.0);
        assert_eq!(far.weight(150.0), 0.0);
        assert_relative_eq!(far.log_weight(150.0), -11250.0);
        assert_relative_eq!(DistanceWeighting::idw(400.0).log_weight(100.0), -400.0 * 100f64.ln());
    }

    #[test]
    fn test_validation() {
        assert!(DistanceWeighting::default().validate().is_ok());
        assert!(DistanceWeighting::idw(0.0).validate().is_err());
        assert!(DistanceWeighting::idw(-2.0).validate().is_err());
        assert!(DistanceWeighting::idw(f64::NAN).validate().is_err());
        assert!(DistanceWeighting::gaussian(0.0).validate().is_err());
        assert!(DistanceWeighting::exponential(5.0).validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let w: DistanceWeighting =
            serde_json::from_str(r#"{"kernel": "gaussian", "bandwidth": 250.0}"#).unwrap();
        assert_eq!(w.kernel, WeightingKernel::Gaussian);
        assert_eq!(w.bandwidth, 250.0);
        assert_eq!(w.power, 2.0);
    }
}
