//! Paired Bernoulli circular spreading
//!
//! Chips come in pairs around a centre `μ`. The first chip of a pair is drawn
//! so that its squared offset `(x − μ)²` is uniform on `[0, 1]`; the second
//! one sits on the unit circle with it, `(y − μ)² = 1 − (x − μ)²`, with a
//! random sign. Both chips therefore have mean `μ` and variance `1/2`.

use rand::{Rng, RngCore};

use super::{Spreading, SpreadingFamily};
use crate::types::{CskError, CskResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedBernoulliCircular {
    centre: f64,
}

impl PairedBernoulliCircular {
    pub fn new(params: &[f64]) -> CskResult<Self> {
        let family = SpreadingFamily::Pbcs;
        let centre = match params {
            [] => 0.0,
            &[centre] => centre,
            _ => {
                return Err(CskError::parameter(
                    family,
                    format!("expected 1 parameter, got {}", params.len()),
                ))
            }
        };
        if !centre.is_finite() {
            return Err(CskError::parameter(family, "centre must be finite"));
        }
        Ok(Self { centre })
    }

    fn first_of_pair(&self, u: f64) -> f64 {
        if u < 0.5 {
            self.centre - (1.0 - 2.0 * u).sqrt()
        } else {
            self.centre + (2.0 * u - 1.0).sqrt()
        }
    }

    fn second_of_pair(&self, first: f64, positive: bool) -> f64 {
        let offset = first - self.centre;
        let radius = (1.0 - offset * offset).max(0.0).sqrt();
        if positive {
            self.centre + radius
        } else {
            self.centre - radius
        }
    }
}

impl Spreading for PairedBernoulliCircular {
    fn family(&self) -> SpreadingFamily {
        SpreadingFamily::Pbcs
    }

    fn params(&self) -> Vec<f64> {
        vec![self.centre]
    }

    fn mean(&self) -> CskResult<f64> {
        Ok(self.centre)
    }

    fn variance(&self) -> CskResult<f64> {
        Ok(0.5)
    }

    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        for pair in chips.chunks_mut(2) {
            let first = self.first_of_pair(rng.gen::<f64>());
            pair[0] = first;
            if let Some(second) = pair.get_mut(1) {
                *second = self.second_of_pair(first, rng.gen::<bool>());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreading::test_util::{assert_moments, pooled};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parameter_validation() {
        assert_eq!(PairedBernoulliCircular::new(&[]).unwrap().params(), vec![0.0]);
        assert!(PairedBernoulliCircular::new(&[-4.0]).is_ok());
        assert!(PairedBernoulliCircular::new(&[0.0, 1.0]).is_err());
        assert!(PairedBernoulliCircular::new(&[f64::INFINITY]).is_err());
    }

    #[test]
    fn test_pairs_lie_on_unit_circle() {
        let spreading = PairedBernoulliCircular::new(&[2.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let chips = spreading.generate(101, &mut rng).unwrap();
        for pair in chips.chunks_exact(2) {
            let r2 = (pair[0] - 2.0).powi(2) + (pair[1] - 2.0).powi(2);
            assert!((r2 - 1.0).abs() < 1e-12);
        }
        assert!((chips[100] - 2.0).abs() <= 1.0);
    }

    #[test]
    fn test_moments_match_samples() {
        for (seed, centre) in [(4, 0.0), (5, 1.5)] {
            let spreading = PairedBernoulliCircular::new(&[centre]).unwrap();
            let samples = pooled(&spreading, 1000, 10, seed);
            assert_moments(&spreading, &samples, 0.03, 0.02);
        }
    }
}
