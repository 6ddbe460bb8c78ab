//! Coherent CSK receiver: the receiver knows the spreading sequence and
//! correlates the received vector against it.

use rand::RngCore;

use super::{decide, dot, BerLowerBound, Link, LowerBoundKind, SymbolSimulator};
use crate::types::{CskResult, DecodeOutcome};

/// Standard normal CDF.
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x / std::f64::consts::SQRT_2)
}

/// `Φ(−√(L·σ²_spr / σ²_noise))`
pub fn jensen_lower_bound(length: usize, spreading_variance: f64, noise_variance: f64) -> f64 {
    standard_normal_cdf(-(length as f64 * spreading_variance / noise_variance).sqrt())
}

#[derive(Debug)]
pub struct CoherentSystem {
    link: Link,
    spreading: Vec<f64>,
    received: Vec<f64>,
}

impl CoherentSystem {
    pub fn new(link: Link) -> Self {
        let length = link.length();
        Self {
            link,
            spreading: vec![0.0; length],
            received: vec![0.0; length],
        }
    }

    /// Correlation statistic `⟨received, spreading⟩`.
    fn correlate(&self) -> DecodeOutcome {
        decide(dot(&self.received, &self.spreading))
    }
}

impl SymbolSimulator for CoherentSystem {
    fn link(&self) -> &Link {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    fn set_spreading_length(&mut self, length: usize) {
        self.link.set_length(length);
        self.spreading.resize(length, 0.0);
        self.received.resize(length, 0.0);
    }

    fn simulate_symbol(&mut self, rng: &mut dyn RngCore) -> CskResult<DecodeOutcome> {
        self.link.spreading().centered_into(&mut self.spreading, rng)?;
        let bit = self.link.bit().value();
        for (r, s) in self.received.iter_mut().zip(&self.spreading) {
            *r = bit * s;
        }
        self.link.noise().add_to(&mut self.received, rng);
        Ok(self.correlate())
    }
}

impl BerLowerBound for CoherentSystem {
    fn ber_lower_bound(&self, kind: LowerBoundKind) -> f64 {
        match kind {
            LowerBoundKind::Jensen => jensen_lower_bound(
                self.link.length(),
                self.link.spreading().variance(),
                self.link.noise_variance(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::NoiseFamily;
    use crate::spreading::{SpreadingFamily, SpreadingSource};
    use crate::system::test_util::Silence;
    use crate::types::Bit;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn silent_link(bit: Bit, family: SpreadingFamily) -> Link {
        let spreading = SpreadingSource::new(family, &[]).unwrap();
        Link::with_noise(bit, 31, spreading, Box::new(Silence), Vec::new())
    }

    #[test]
    fn test_noiseless_decoding_is_exact() {
        let mut rng = StdRng::seed_from_u64(77);
        for family in [SpreadingFamily::Logistic, SpreadingFamily::Normal, SpreadingFamily::Pbcs] {
            for bit in [Bit::Plus, Bit::Minus] {
                let mut system = CoherentSystem::new(silent_link(bit, family));
                for _ in 0..200 {
                    let outcome = system.simulate_symbol(&mut rng).unwrap();
                    assert_eq!(outcome, DecodeOutcome::Estimate(bit));
                }
            }
        }
    }

    #[test]
    fn test_normal_cdf() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-15);
        assert!((standard_normal_cdf(1.959_963_985) - 0.975).abs() < 1e-9);
        assert!((standard_normal_cdf(-1.0) - 0.158_655_253_9).abs() < 1e-9);
    }

    #[test]
    fn test_jensen_bound_at_5db() {
        // L·σ²/σ²_n = 10^0.5 at 5 dB
        let spreading = SpreadingSource::new(SpreadingFamily::Logistic, &[]).unwrap();
        let mut link = Link::new(Bit::Plus, 31, spreading, NoiseFamily::White, 1.0, &[]).unwrap();
        link.set_snr_per_bit(5.0).unwrap();
        let system = CoherentSystem::new(link);
        let bound = system.ber_lower_bound(LowerBoundKind::Jensen);
        assert!((bound - standard_normal_cdf(-(10f64.powf(0.5)).sqrt())).abs() < 1e-12);
        assert!((bound - 0.0376).abs() < 1e-3);
    }

    #[test]
    fn test_length_change_resizes() {
        let mut system = CoherentSystem::new(silent_link(Bit::Plus, SpreadingFamily::Tent));
        system.set_spreading_length(63);
        assert_eq!(system.link().length(), 63);
        let mut rng = StdRng::seed_from_u64(1);
        system.simulate_symbol(&mut rng).unwrap();
        assert_eq!(system.spreading.len(), 63);
    }
}
