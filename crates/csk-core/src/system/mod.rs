//! CSK Link Simulation
//!
//! A [`Link`] holds what one BER point needs: the transmitted bit, the
//! spreading length and generator, and the noise generator. The system
//! variants turn a link into a [`SymbolSimulator`] that transmits and
//! decodes one bit per call:
//!
//! - [`CoherentSystem`]: one received vector, correlated against the known
//!   spreading sequence.
//! - [`NonCoherentSystem`]: a data vector and a reference vector with
//!   independent noise, decoded by correlation or by Monte-Carlo maximum
//!   likelihood.
//!
//! ## SNR
//!
//! The per-bit SNR relates to the noise variance through the energy of one
//! spreading sequence:
//!
//! ```text
//! σ²_noise = L·σ²_spr / 10^(snr/10)        snr = 10·log10(L·σ²_spr / σ²_noise)
//! ```

pub mod coherent;
pub mod noncoherent;

pub use coherent::CoherentSystem;
pub use noncoherent::NonCoherentSystem;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::noise::{Noise, NoiseFamily};
use crate::spreading::SpreadingSource;
use crate::types::{Bit, CskError, CskResult, DecodeOutcome};

/// Noise variance giving `snr_per_bit` dB.
pub fn snr_to_noise_variance(snr_per_bit: f64, length: usize, spreading_variance: f64) -> f64 {
    length as f64 * spreading_variance / 10f64.powf(snr_per_bit / 10.0)
}

/// Per-bit SNR in dB for `noise_variance`.
pub fn noise_variance_to_snr(noise_variance: f64, length: usize, spreading_variance: f64) -> f64 {
    10.0 * (length as f64 * spreading_variance / noise_variance).log10()
}

/// Sign decision on a statistic.
#[inline]
pub fn decide(statistic: f64) -> DecodeOutcome {
    DecodeOutcome::from_statistic(statistic)
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub(crate) fn squared_distance(a: &[f64], b: &[f64], sign: f64) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - sign * y).powi(2)).sum()
}

/// Which variant of the CSK system to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    #[default]
    #[serde(alias = "csk-coh-su")]
    Coherent,
    #[serde(alias = "csk-ncoh-su")]
    NonCoherent,
}

impl SystemKind {
    pub fn name(self) -> &'static str {
        match self {
            SystemKind::Coherent => "coherent",
            SystemKind::NonCoherent => "noncoherent",
        }
    }
}

impl std::fmt::Display for SystemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SystemKind {
    type Err = CskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coherent" | "csk-coh-su" => Ok(SystemKind::Coherent),
            "noncoherent" | "csk-ncoh-su" => Ok(SystemKind::NonCoherent),
            other => Err(CskError::UnknownFamily {
                kind: "system",
                name: other.to_string(),
            }),
        }
    }
}

/// Decoding algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DecoderKind {
    /// Correlation decoder
    #[default]
    #[serde(rename = "corr")]
    Correlation,
    /// Monte-Carlo maximum-likelihood decoder
    #[serde(rename = "mcml")]
    Mcml,
}

impl DecoderKind {
    pub fn name(self) -> &'static str {
        match self {
            DecoderKind::Correlation => "corr",
            DecoderKind::Mcml => "mcml",
        }
    }
}

impl std::fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DecoderKind {
    type Err = CskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "corr" => Ok(DecoderKind::Correlation),
            "mcml" => Ok(DecoderKind::Mcml),
            other => Err(CskError::UnknownFamily {
                kind: "decoder",
                name: other.to_string(),
            }),
        }
    }
}

/// Settings of the Monte-Carlo maximum-likelihood decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McmlSettings {
    /// Spreading realizations averaged per likelihood evaluation
    pub realizations: usize,
    /// Initial `[lower, middle]` abscissae for bracketing; when absent,
    /// `[0.5, 1.5]` times the true noise variance
    pub bracket: Option<[f64; 2]>,
    /// Relative precision of the golden-section search
    pub tolerance: f64,
}

impl Default for McmlSettings {
    fn default() -> Self {
        Self {
            realizations: 100,
            bracket: None,
            tolerance: 1e-10,
        }
    }
}

/// Analytic lower bound on the BER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowerBoundKind {
    Jensen,
}

impl std::str::FromStr for LowerBoundKind {
    type Err = CskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jensen" => Ok(LowerBoundKind::Jensen),
            other => Err(CskError::UnknownFamily {
                kind: "BER lower bound",
                name: other.to_string(),
            }),
        }
    }
}

/// State shared by every trial of a BER point.
#[derive(Debug)]
pub struct Link {
    bit: Bit,
    length: usize,
    spreading: SpreadingSource,
    noise: Box<dyn Noise>,
    noise_params: Vec<f64>,
}

impl Link {
    /// Build a link with noise of `noise_family` at `noise_variance`.
    pub fn new(
        bit: Bit,
        length: usize,
        spreading: SpreadingSource,
        noise_family: NoiseFamily,
        noise_variance: f64,
        noise_params: &[f64],
    ) -> CskResult<Self> {
        let noise = noise_family.initialize(noise_variance, noise_params)?;
        Ok(Self::with_noise(bit, length, spreading, noise, noise_params.to_vec()))
    }

    /// Build a link around an existing noise generator.
    pub fn with_noise(
        bit: Bit,
        length: usize,
        spreading: SpreadingSource,
        noise: Box<dyn Noise>,
        noise_params: Vec<f64>,
    ) -> Self {
        Self {
            bit,
            length,
            spreading,
            noise,
            noise_params,
        }
    }

    pub fn bit(&self) -> Bit {
        self.bit
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn spreading(&self) -> &SpreadingSource {
        &self.spreading
    }

    pub fn noise(&self) -> &dyn Noise {
        self.noise.as_ref()
    }

    pub fn noise_variance(&self) -> f64 {
        self.noise.variance()
    }

    pub(crate) fn set_length(&mut self, length: usize) {
        self.length = length;
    }

    /// Regenerate the noise parameters for a new variance.
    pub fn set_noise_variance(&mut self, noise_variance: f64) -> CskResult<()> {
        self.noise = self.noise.family().initialize(noise_variance, &self.noise_params)?;
        Ok(())
    }

    /// Set the noise variance that yields `snr_per_bit` dB at the current length.
    pub fn set_snr_per_bit(&mut self, snr_per_bit: f64) -> CskResult<()> {
        self.set_noise_variance(self.snr_to_noise_variance(snr_per_bit))
    }

    pub fn snr_to_noise_variance(&self, snr_per_bit: f64) -> f64 {
        snr_to_noise_variance(snr_per_bit, self.length, self.spreading.variance())
    }

    pub fn noise_variance_to_snr(&self, noise_variance: f64) -> f64 {
        noise_variance_to_snr(noise_variance, self.length, self.spreading.variance())
    }

    /// Current per-bit SNR in dB.
    pub fn snr_per_bit(&self) -> f64 {
        self.noise_variance_to_snr(self.noise_variance())
    }
}

/// Transmits and decodes one bit per call.
pub trait SymbolSimulator {
    fn link(&self) -> &Link;

    fn link_mut(&mut self) -> &mut Link;

    /// Resize internal buffers for a new spreading length.
    fn set_spreading_length(&mut self, length: usize);

    /// Run one trial.
    ///
    /// A tied statistic is `Ok(DecodeOutcome::Ambiguous)`; errors for which
    /// [`CskError::is_decode_failure`] holds spoil only this trial.
    fn simulate_symbol(&mut self, rng: &mut dyn RngCore) -> CskResult<DecodeOutcome>;

    fn transmitted_bit(&self) -> Bit {
        self.link().bit()
    }
}

/// Analytic BER bound for the current link state.
pub trait BerLowerBound {
    fn ber_lower_bound(&self, kind: LowerBoundKind) -> f64;
}

/// Closed set of simulated systems, chosen once per configuration.
#[derive(Debug)]
pub enum CskSystem {
    Coherent(CoherentSystem),
    NonCoherent(NonCoherentSystem),
}

impl CskSystem {
    /// Build `kind` around `link` with the selected decoder.
    ///
    /// The coherent system only supports correlation; `mcml` settings are
    /// required for the maximum-likelihood decoder.
    pub fn new(
        kind: SystemKind,
        link: Link,
        decoder: DecoderKind,
        mcml: Option<McmlSettings>,
    ) -> CskResult<Self> {
        match kind {
            SystemKind::Coherent => match decoder {
                DecoderKind::Correlation => Ok(CskSystem::Coherent(CoherentSystem::new(link))),
                DecoderKind::Mcml => Err(CskError::parameter(
                    "decoder",
                    "the coherent system supports only the correlation decoder",
                )),
            },
            SystemKind::NonCoherent => {
                let system = match decoder {
                    DecoderKind::Correlation => NonCoherentSystem::correlation(link),
                    DecoderKind::Mcml => {
                        let settings = mcml.ok_or_else(|| {
                            CskError::parameter("decoder", "the mcml decoder requires its settings")
                        })?;
                        NonCoherentSystem::mcml(link, settings)?
                    }
                };
                Ok(CskSystem::NonCoherent(system))
            }
        }
    }

    /// Lower bound, when the system provides one.
    pub fn lower_bound(&self) -> Option<&dyn BerLowerBound> {
        match self {
            CskSystem::Coherent(system) => Some(system),
            CskSystem::NonCoherent(_) => None,
        }
    }

    fn inner(&self) -> &dyn SymbolSimulator {
        match self {
            CskSystem::Coherent(system) => system,
            CskSystem::NonCoherent(system) => system,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SymbolSimulator {
        match self {
            CskSystem::Coherent(system) => system,
            CskSystem::NonCoherent(system) => system,
        }
    }
}

impl SymbolSimulator for CskSystem {
    fn link(&self) -> &Link {
        self.inner().link()
    }

    fn link_mut(&mut self) -> &mut Link {
        self.inner_mut().link_mut()
    }

    fn set_spreading_length(&mut self, length: usize) {
        self.inner_mut().set_spreading_length(length);
    }

    fn simulate_symbol(&mut self, rng: &mut dyn RngCore) -> CskResult<DecodeOutcome> {
        self.inner_mut().simulate_symbol(rng)
    }
}
