//! Circular map
//!
//! On `[-1, 1]` with parameter `0 < p < 1`:
//!
//! ```text
//! f(x) =  √(1 − x²/p)            |x| < √p
//! f(x) = −√((1 − x²)/(1 − p))    otherwise
//! ```
//!
//! The invariant density is `2(1−p)|x|` on `[-1, 0]` and `2p·x` on `[0, 1]`,
//! which gives the mean `(4p − 2)/3` and a second moment of `1/2`.

use rand::{Rng, RngCore};

use super::{iterate_map, Spreading, SpreadingFamily};
use crate::types::{CskError, CskResult};

pub const DEFAULT_P: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularMap {
    p: f64,
}

impl CircularMap {
    pub fn new(params: &[f64]) -> CskResult<Self> {
        let family = SpreadingFamily::Circular;
        let p = match params {
            [] => DEFAULT_P,
            &[p] => p,
            _ => {
                return Err(CskError::parameter(
                    family,
                    format!("expected 1 parameter, got {}", params.len()),
                ))
            }
        };
        if !(p > 0.0 && p < 1.0) {
            return Err(CskError::parameter(
                family,
                format!("parameter must lie in (0, 1), got {p}"),
            ));
        }
        Ok(Self { p })
    }

    pub fn apply(&self, x: f64) -> CskResult<f64> {
        if !(-1.0..=1.0).contains(&x) {
            return Err(CskError::Domain {
                map: "circular",
                value: x,
            });
        }
        let x2 = x * x;
        let image = if x2 < self.p {
            ((1.0 - x2 / self.p).max(0.0)).sqrt()
        } else {
            -(((1.0 - x2) / (1.0 - self.p)).max(0.0)).sqrt()
        };
        Ok(image.clamp(-1.0, 1.0))
    }

    /// Inverse CDF of the invariant law.
    fn seed(&self, u: f64) -> f64 {
        let q = 1.0 - self.p;
        if u < q {
            -((q - u) / q).sqrt()
        } else {
            ((u - q) / self.p).sqrt()
        }
    }
}

impl Spreading for CircularMap {
    fn family(&self) -> SpreadingFamily {
        SpreadingFamily::Circular
    }

    fn params(&self) -> Vec<f64> {
        vec![self.p]
    }

    fn mean(&self) -> CskResult<f64> {
        Ok((4.0 * self.p - 2.0) / 3.0)
    }

    fn variance(&self) -> CskResult<f64> {
        let mean = self.mean()?;
        Ok(0.5 - mean * mean)
    }

    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        let seed = self.seed(rng.gen::<f64>());
        iterate_map(chips, seed, |x| self.apply(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreading::test_util::{assert_moments, pooled};

    #[test]
    fn test_parameter_validation() {
        assert_eq!(CircularMap::new(&[]).unwrap().params(), vec![0.5]);
        assert!(CircularMap::new(&[0.3]).is_ok());
        for bad in [&[0.0][..], &[1.0], &[-0.5], &[0.2, 0.3], &[f64::NAN]] {
            assert!(matches!(CircularMap::new(bad), Err(CskError::Parameter { .. })));
        }
    }

    #[test]
    fn test_moments() {
        let map = CircularMap::new(&[0.5]).unwrap();
        assert!(map.mean().unwrap().abs() < 1e-15);
        assert!((map.variance().unwrap() - 0.5).abs() < 1e-15);

        let map = CircularMap::new(&[0.8]).unwrap();
        assert!((map.mean().unwrap() - 0.4).abs() < 1e-12);
        assert!((map.variance().unwrap() - 0.34).abs() < 1e-12);
    }

    #[test]
    fn test_seed_inverse_cdf_endpoints() {
        let map = CircularMap::new(&[0.25]).unwrap();
        assert!((map.seed(0.0) + 1.0).abs() < 1e-12);
        assert!(map.seed(0.75).abs() < 1e-12);
        assert!((map.seed(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_map_values() {
        let map = CircularMap::new(&[0.5]).unwrap();
        assert!((map.apply(0.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((map.apply(1.0).unwrap() - 0.0).abs() < 1e-12);
        assert!((map.apply(-1.0).unwrap() - 0.0).abs() < 1e-12);
        assert!(map.apply(0.9).unwrap() < 0.0);
        assert!(matches!(map.apply(1.01), Err(CskError::Domain { .. })));
    }

    #[test]
    fn test_moments_match_samples() {
        for (seed, p) in [(1, 0.5), (2, 0.3), (3, 0.8)] {
            let map = CircularMap::new(&[p]).unwrap();
            let samples = pooled(&map, 25, 400, seed);
            assert_moments(&map, &samples, 0.04, 0.03);
        }
    }
}
