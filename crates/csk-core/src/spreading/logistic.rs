//! Fully chaotic logistic map `x ↦ 4x(1 − x)` on `[0, 1]`, seeded from its
//! arcsine invariant law, Beta(½, ½).

use rand::RngCore;
use rand_distr::{Beta, Distribution};

use super::{iterate_map, Spreading, SpreadingFamily};
use crate::types::{CskError, CskResult};

#[derive(Debug, Clone)]
pub struct LogisticMap {
    seed_law: Beta<f64>,
}

impl LogisticMap {
    /// The map takes no parameters.
    pub fn new(params: &[f64]) -> CskResult<Self> {
        let family = SpreadingFamily::Logistic;
        if !params.is_empty() {
            return Err(CskError::parameter(
                family,
                format!("the map takes no parameters, got {}", params.len()),
            ));
        }
        let seed_law = Beta::new(0.5, 0.5).map_err(|e| CskError::parameter(family, e.to_string()))?;
        Ok(Self { seed_law })
    }

    pub fn apply(x: f64) -> CskResult<f64> {
        if !(0.0..=1.0).contains(&x) {
            return Err(CskError::Domain {
                map: "logistic",
                value: x,
            });
        }
        Ok((4.0 * x * (1.0 - x)).clamp(0.0, 1.0))
    }
}

impl Spreading for LogisticMap {
    fn family(&self) -> SpreadingFamily {
        SpreadingFamily::Logistic
    }

    fn params(&self) -> Vec<f64> {
        Vec::new()
    }

    fn mean(&self) -> CskResult<f64> {
        Ok(0.5)
    }

    fn variance(&self) -> CskResult<f64> {
        Ok(0.125)
    }

    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        let seed = self.seed_law.sample(rng);
        iterate_map(chips, seed, LogisticMap::apply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreading::test_util::{assert_moments, pooled};

    #[test]
    fn test_rejects_parameters() {
        assert!(LogisticMap::new(&[]).is_ok());
        assert!(matches!(LogisticMap::new(&[4.0]), Err(CskError::Parameter { .. })));
    }

    #[test]
    fn test_map() {
        assert_eq!(LogisticMap::apply(0.5).unwrap(), 1.0);
        assert_eq!(LogisticMap::apply(1.0).unwrap(), 0.0);
        assert!((LogisticMap::apply(0.25).unwrap() - 0.75).abs() < 1e-15);
        assert!(matches!(LogisticMap::apply(-0.1), Err(CskError::Domain { .. })));
    }

    #[test]
    fn test_moments_match_samples() {
        let map = LogisticMap::new(&[]).unwrap();
        let samples = pooled(&map, 1000, 10, 21);
        assert_moments(&map, &samples, 0.02, 0.01);
    }
}
