//! Additive Channel Noise
//!
//! Noise samples are i.i.d. with a law fixed by the noise family and its
//! variance. Only white (zero-mean Gaussian) noise is provided.
//!
//! ```rust
//! use csk_core::noise::NoiseFamily;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let noise = NoiseFamily::White.initialize(0.25, &[]).unwrap();
//! let mut rng = StdRng::seed_from_u64(7);
//! let samples = noise.sample(64, &mut rng);
//! assert_eq!(samples.len(), 64);
//! ```

use rand::RngCore;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{CskError, CskResult};

/// Noise family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseFamily {
    /// Zero-mean Gaussian
    #[default]
    White,
}

impl NoiseFamily {
    pub fn name(self) -> &'static str {
        match self {
            NoiseFamily::White => "white",
        }
    }

    /// Build a generator for `variance`.
    ///
    /// Fails with [`CskError::Parameter`] when `variance` is not positive.
    pub fn initialize(self, variance: f64, params: &[f64]) -> CskResult<Box<dyn Noise>> {
        match self {
            NoiseFamily::White => {
                if !params.is_empty() {
                    warn!(family = self.name(), ?params, "Extra noise parameters are ignored");
                }
                Ok(Box::new(WhiteNoise::new(variance)?))
            }
        }
    }
}

impl std::fmt::Display for NoiseFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for NoiseFamily {
    type Err = CskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(NoiseFamily::White),
            other => Err(CskError::UnknownFamily {
                kind: "noise",
                name: other.to_string(),
            }),
        }
    }
}

/// Source of additive noise samples.
pub trait Noise: std::fmt::Debug + Send + Sync {
    fn family(&self) -> NoiseFamily;

    fn variance(&self) -> f64;

    /// Add one noise sample to every element of `signal`.
    fn add_to(&self, signal: &mut [f64], rng: &mut dyn RngCore);

    /// Draw `length` samples.
    fn sample(&self, length: usize, rng: &mut dyn RngCore) -> Vec<f64> {
        let mut samples = vec![0.0; length];
        self.add_to(&mut samples, rng);
        samples
    }
}

/// Zero-mean Gaussian noise
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    variance: f64,
    law: Normal<f64>,
}

impl WhiteNoise {
    pub fn new(variance: f64) -> CskResult<Self> {
        if !(variance > 0.0 && variance.is_finite()) {
            return Err(CskError::parameter(
                NoiseFamily::White,
                format!("variance must be positive, got {variance}"),
            ));
        }
        let law = Normal::new(0.0, variance.sqrt())
            .map_err(|e| CskError::parameter(NoiseFamily::White, e.to_string()))?;
        Ok(Self { variance, law })
    }
}

impl Noise for WhiteNoise {
    fn family(&self) -> NoiseFamily {
        NoiseFamily::White
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn add_to(&self, signal: &mut [f64], rng: &mut dyn RngCore) {
        for x in signal.iter_mut() {
            *x += self.law.sample(&mut *rng);
        }
    }
}
