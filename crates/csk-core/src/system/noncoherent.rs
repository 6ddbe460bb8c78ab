//! Non-coherent CSK receiver
//!
//! Each trial sends the spreading sequence twice through independent noise:
//!
//! ```text
//! data      = bit·s + n₁
//! reference =     s + n₂
//! ```
//!
//! The correlation decoder takes the sign of `⟨data, reference⟩`. The
//! Monte-Carlo maximum-likelihood (MCML) decoder compares the likelihoods of
//! the two bit hypotheses, with the unknown spreading sequence integrated out
//! over fresh realizations `sᵢ` and the noise variance `v` treated as a
//! nuisance parameter:
//!
//! ```text
//! f±(i)  = ‖data ∓ sᵢ‖² + ‖reference − sᵢ‖²
//! g±(v)  = −Σᵢ exp(−f±(i) / 2v) / (2·n·v^L)
//! decide = sign( min g₋ − min g₊ )
//! ```

use rand::RngCore;
use tracing::trace;

use super::{decide, dot, squared_distance, Link, McmlSettings, SymbolSimulator};
use crate::minimize::{bracket, GoldenSection};
use crate::types::{CskError, CskResult, DecodeOutcome};

/// Negated Monte-Carlo likelihood surrogate at noise variance `v`.
///
/// `+∞` outside `v > 0`.
pub fn mcml_objective(distances: &[f64], length: usize, v: f64) -> f64 {
    if !(v > 0.0 && v.is_finite()) {
        return f64::INFINITY;
    }
    let sum: f64 = distances.iter().map(|f| (-f / (2.0 * v)).exp()).sum();
    -sum / (2.0 * distances.len() as f64 * v.powi(length as i32))
}

#[derive(Debug)]
enum Decoder {
    Correlation,
    Mcml {
        settings: McmlSettings,
        realization: Vec<f64>,
        plus: Vec<f64>,
        minus: Vec<f64>,
    },
}

#[derive(Debug)]
pub struct NonCoherentSystem {
    link: Link,
    decoder: Decoder,
    spreading: Vec<f64>,
    data: Vec<f64>,
    reference: Vec<f64>,
}

impl NonCoherentSystem {
    pub fn correlation(link: Link) -> Self {
        Self::with_decoder(link, Decoder::Correlation)
    }

    /// MCML decoder with `settings`.
    pub fn mcml(link: Link, settings: McmlSettings) -> CskResult<Self> {
        if settings.realizations == 0 {
            return Err(CskError::parameter("mcml", "at least one realization is required"));
        }
        if !(settings.tolerance > 0.0) {
            return Err(CskError::parameter("mcml", "tolerance must be positive"));
        }
        let decoder = Decoder::Mcml {
            settings,
            realization: vec![0.0; link.length()],
            plus: vec![0.0; settings.realizations],
            minus: vec![0.0; settings.realizations],
        };
        Ok(Self::with_decoder(link, decoder))
    }

    fn with_decoder(link: Link, decoder: Decoder) -> Self {
        let length = link.length();
        Self {
            link,
            decoder,
            spreading: vec![0.0; length],
            data: vec![0.0; length],
            reference: vec![0.0; length],
        }
    }

    fn decode(&mut self, rng: &mut dyn RngCore) -> CskResult<DecodeOutcome> {
        match &mut self.decoder {
            Decoder::Correlation => Ok(decide(dot(&self.data, &self.reference))),
            Decoder::Mcml {
                settings,
                realization,
                plus,
                minus,
            } => {
                let source = self.link.spreading();
                for (f_plus, f_minus) in plus.iter_mut().zip(minus.iter_mut()) {
                    source.centered_into(realization, rng)?;
                    let shared = squared_distance(&self.reference, realization, 1.0);
                    *f_plus = squared_distance(&self.data, realization, 1.0) + shared;
                    *f_minus = squared_distance(&self.data, realization, -1.0) + shared;
                }

                let [start, middle] = settings.bracket.unwrap_or_else(|| {
                    let v = self.link.noise_variance();
                    [0.5 * v, 1.5 * v]
                });
                let length = self.link.length();
                let search = GoldenSection::new(settings.tolerance);

                let mut g_plus = |v: f64| mcml_objective(plus, length, v);
                let triple = bracket(&mut g_plus, start, middle)?;
                let e_plus = -search.minimize(&mut g_plus, &triple).value;

                let mut g_minus = |v: f64| mcml_objective(minus, length, v);
                let triple = bracket(&mut g_minus, start, middle)?;
                let e_minus = -search.minimize(&mut g_minus, &triple).value;

                trace!(e_plus, e_minus, "MCML likelihoods");
                Ok(decide(e_plus - e_minus))
            }
        }
    }
}

impl SymbolSimulator for NonCoherentSystem {
    fn link(&self) -> &Link {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }

    fn set_spreading_length(&mut self, length: usize) {
        self.link.set_length(length);
        self.spreading.resize(length, 0.0);
        self.data.resize(length, 0.0);
        self.reference.resize(length, 0.0);
        if let Decoder::Mcml { realization, .. } = &mut self.decoder {
            realization.resize(length, 0.0);
        }
    }

    fn simulate_symbol(&mut self, rng: &mut dyn RngCore) -> CskResult<DecodeOutcome> {
        self.link.spreading().centered_into(&mut self.spreading, rng)?;
        let bit = self.link.bit().value();
        for ((d, r), s) in self.data.iter_mut().zip(self.reference.iter_mut()).zip(&self.spreading) {
            *d = bit * s;
            *r = *s;
        }
        self.link.noise().add_to(&mut self.data, rng);
        self.link.noise().add_to(&mut self.reference, rng);
        self.decode(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::BerEstimator;
    use crate::noise::NoiseFamily;
    use crate::spreading::{SpreadingFamily, SpreadingSource};
    use crate::system::test_util::Silence;
    use crate::types::Bit;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn link(bit: Bit, length: usize, snr: f64) -> Link {
        let spreading = SpreadingSource::new(SpreadingFamily::Logistic, &[]).unwrap();
        let mut link = Link::new(bit, length, spreading, NoiseFamily::White, 1.0, &[]).unwrap();
        link.set_snr_per_bit(snr).unwrap();
        link
    }

    #[test]
    fn test_objective_guards_non_positive_variance() {
        assert_eq!(mcml_objective(&[1.0, 2.0], 4, 0.0), f64::INFINITY);
        assert_eq!(mcml_objective(&[1.0, 2.0], 4, -1.0), f64::INFINITY);
        assert_eq!(mcml_objective(&[1.0], 4, f64::NAN), f64::INFINITY);
        assert!(mcml_objective(&[1.0, 2.0], 4, 0.5) < 0.0);
    }

    #[test]
    fn test_objective_minimum_location() {
        // Single distance f: minimum of −exp(−f/2v)/v^L at v = f/(2L)
        let (f, length) = (8.0, 4);
        let mut g = |v: f64| mcml_objective(&[f], length, v);
        let triple = bracket(&mut g, 0.5, 1.5).unwrap();
        let min = GoldenSection::default().minimize(&mut g, &triple);
        assert!((min.x - 1.0).abs() < 1e-5, "argmin {}", min.x);
    }

    #[test]
    fn test_noiseless_correlation() {
        let spreading = SpreadingSource::new(SpreadingFamily::Normal, &[]).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        for bit in [Bit::Plus, Bit::Minus] {
            let link = Link::with_noise(bit, 16, spreading_clone(&spreading), Box::new(Silence), Vec::new());
            let mut system = NonCoherentSystem::correlation(link);
            for _ in 0..100 {
                assert_eq!(system.simulate_symbol(&mut rng).unwrap(), DecodeOutcome::Estimate(bit));
            }
        }
    }

    fn spreading_clone(source: &SpreadingSource) -> SpreadingSource {
        SpreadingSource::new(source.family(), &source.params()).unwrap()
    }

    #[test]
    fn test_mcml_low_ber_at_high_snr() {
        let settings = McmlSettings {
            realizations: 500,
            ..Default::default()
        };
        let mut system = NonCoherentSystem::mcml(link(Bit::Plus, 4, 20.0), settings).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let point = BerEstimator::new(200).run(&mut system, &mut rng).unwrap();
        assert!(point.ber < 0.2, "ber {}", point.ber);
    }

    #[test]
    fn test_correlation_beats_chance() {
        let mut system = NonCoherentSystem::correlation(link(Bit::Minus, 31, 10.0));
        let mut rng = StdRng::seed_from_u64(9);
        let point = BerEstimator::new(2000).run(&mut system, &mut rng).unwrap();
        assert_eq!(point.decode_failures, 0);
        assert!(point.ber < 0.2, "ber {}", point.ber);
    }

    #[test]
    fn test_mcml_rejects_bad_settings() {
        let zero = McmlSettings {
            realizations: 0,
            ..Default::default()
        };
        assert!(NonCoherentSystem::mcml(link(Bit::Plus, 4, 0.0), zero).is_err());
        let tolerance = McmlSettings {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(NonCoherentSystem::mcml(link(Bit::Plus, 4, 0.0), tolerance).is_err());
    }

    #[test]
    fn test_mcml_resizes_with_length() {
        let mut system =
            NonCoherentSystem::mcml(link(Bit::Plus, 4, 10.0), McmlSettings::default()).unwrap();
        system.set_spreading_length(9);
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = system.simulate_symbol(&mut rng).unwrap();
        assert!(matches!(outcome, DecodeOutcome::Estimate(_)), "{outcome:?}");
        assert_eq!(system.data.len(), 9);
        assert_eq!(system.spreading.len(), 9);
        assert!(matches!(&system.decoder, Decoder::Mcml { realization, .. } if realization.len() == 9));
    }

    #[test]
    fn test_mcml_bracketing_failure_counts_as_decode_failure() {
        // Coincident starting abscissae never bracket a minimum
        let settings = McmlSettings {
            bracket: Some([0.5, 0.5]),
            ..Default::default()
        };
        let mut system = NonCoherentSystem::mcml(link(Bit::Plus, 8, 5.0), settings).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let err = system.simulate_symbol(&mut rng).unwrap_err();
        assert!(matches!(err, CskError::Bracketing { .. }), "{err:?}");
        assert!(err.is_decode_failure());

        let err = BerEstimator::new(20).run(&mut system, &mut rng).unwrap_err();
        assert!(matches!(err, CskError::AllDecodesFailed { trials: 20 }), "{err:?}");
    }
}
