//! Spreading Sequences for Chaos Shift Keying
//!
//! A CSK transmitter multiplies each information bit by a real-valued
//! spreading sequence. The sequences come from one of ten families: iterated
//! chaotic maps, which draw a seed from the map's invariant law and then apply
//! the map, and statistical families, which draw every chip independently.
//!
//! ## Families
//!
//! ```text
//! ┌──────────────┬──────────────────────┬──────────────────┬──────────────┐
//! │ Family       │ Parameters (default) │ Mean             │ Variance     │
//! ├──────────────┼──────────────────────┼──────────────────┼──────────────┤
//! │ bernoulli    │ a < c < b  (0,.5,1)  │ (a+b)/2          │ (b-a)²/12    │
//! │ negbernoulli │ a < c < b  (0,.5,1)  │ (a+b)/2          │ (b-a)²/12    │
//! │ tent         │ a < c < b  (0,.5,1)  │ (a+b)/2          │ (b-a)²/12    │
//! │ valley       │ a < c < b  (0,.5,1)  │ (a+b)/2          │ (b-a)²/12    │
//! │ circular     │ 0 < p < 1  (.5)      │ (4p-2)/3         │ 1/2 - mean²  │
//! │ logistic     │ none                 │ 1/2              │ 1/8          │
//! │ pbcs         │ μ          (0)       │ μ                │ 1/2          │
//! │ normal       │ μ, σ       (0,1)     │ μ                │ σ²           │
//! │ gumbel       │ μ, β       (1,1)     │ μ + γβ           │ π²β²/6       │
//! │ student      │ ν          (1)       │ 0 (ν > 1)        │ ν/(ν-2)      │
//! └──────────────┴──────────────────────┴──────────────────┴──────────────┘
//! ```
//!
//! The moments are analytic, not sample estimates: decoders and SNR
//! conversions rely on them matching the generator's law.
//!
//! ## Example
//!
//! ```rust
//! use csk_core::spreading::{SpreadingFamily, SpreadingSource};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let source = SpreadingSource::new(SpreadingFamily::Tent, &[]).unwrap();
//! let mut rng = StdRng::seed_from_u64(1);
//! let chips = source.generate_centered(31, &mut rng).unwrap();
//! assert_eq!(chips.len(), 31);
//! assert!((source.variance() - 1.0 / 12.0).abs() < 1e-12);
//! ```

pub mod circular;
pub mod distributions;
pub mod logistic;
pub mod pbcs;
pub mod piecewise;

pub use circular::CircularMap;
pub use distributions::{GumbelSpreading, NormalSpreading, StudentSpreading};
pub use logistic::LogisticMap;
pub use pbcs::PairedBernoulliCircular;
pub use piecewise::{Branching, TwoBranchMap};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::types::{CskError, CskResult};

/// Spreading family, selected once per configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadingFamily {
    /// Non-central Bernoulli map
    Bernoulli,
    /// Circular map
    Circular,
    /// Gumbel (extreme value) samples
    Gumbel,
    /// Fully chaotic logistic map
    Logistic,
    /// Non-central negative Bernoulli map
    #[serde(rename = "negbernoulli")]
    NegativeBernoulli,
    /// Normal samples
    Normal,
    /// Paired Bernoulli circular spreading
    Pbcs,
    /// Student's t samples
    Student,
    /// Non-central tent map
    Tent,
    /// Non-central valley map
    Valley,
}

impl SpreadingFamily {
    /// All families, in name order.
    pub const ALL: [SpreadingFamily; 10] = [
        SpreadingFamily::Bernoulli,
        SpreadingFamily::Circular,
        SpreadingFamily::Gumbel,
        SpreadingFamily::Logistic,
        SpreadingFamily::NegativeBernoulli,
        SpreadingFamily::Normal,
        SpreadingFamily::Pbcs,
        SpreadingFamily::Student,
        SpreadingFamily::Tent,
        SpreadingFamily::Valley,
    ];

    /// Name used in configuration files and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            SpreadingFamily::Bernoulli => "bernoulli",
            SpreadingFamily::Circular => "circular",
            SpreadingFamily::Gumbel => "gumbel",
            SpreadingFamily::Logistic => "logistic",
            SpreadingFamily::NegativeBernoulli => "negbernoulli",
            SpreadingFamily::Normal => "normal",
            SpreadingFamily::Pbcs => "pbcs",
            SpreadingFamily::Student => "student",
            SpreadingFamily::Tent => "tent",
            SpreadingFamily::Valley => "valley",
        }
    }

    /// Validate `params` (filling in defaults) and build the generator.
    pub fn initialize(self, params: &[f64]) -> CskResult<Box<dyn Spreading>> {
        Ok(match self {
            SpreadingFamily::Bernoulli => Box::new(TwoBranchMap::new(Branching::Bernoulli, params)?),
            SpreadingFamily::NegativeBernoulli => {
                Box::new(TwoBranchMap::new(Branching::NegativeBernoulli, params)?)
            }
            SpreadingFamily::Tent => Box::new(TwoBranchMap::new(Branching::Tent, params)?),
            SpreadingFamily::Valley => Box::new(TwoBranchMap::new(Branching::Valley, params)?),
            SpreadingFamily::Circular => Box::new(CircularMap::new(params)?),
            SpreadingFamily::Logistic => Box::new(LogisticMap::new(params)?),
            SpreadingFamily::Pbcs => Box::new(PairedBernoulliCircular::new(params)?),
            SpreadingFamily::Normal => Box::new(NormalSpreading::new(params)?),
            SpreadingFamily::Gumbel => Box::new(GumbelSpreading::new(params)?),
            SpreadingFamily::Student => Box::new(StudentSpreading::new(params)?),
        })
    }
}

impl std::fmt::Display for SpreadingFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SpreadingFamily {
    type Err = CskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpreadingFamily::ALL
            .iter()
            .copied()
            .find(|family| family.name() == s)
            .ok_or_else(|| CskError::UnknownFamily {
                kind: "spreading",
                name: s.to_string(),
            })
    }
}

/// Common trait for all spreading generators.
///
/// Implementations hold already-validated parameters; they are created
/// through [`SpreadingFamily::initialize`].
pub trait Spreading: std::fmt::Debug + Send + Sync {
    /// Family this generator belongs to.
    fn family(&self) -> SpreadingFamily;

    /// Validated parameters, defaults included.
    fn params(&self) -> Vec<f64>;

    /// Theoretical mean of a chip.
    fn mean(&self) -> CskResult<f64>;

    /// Theoretical variance of a chip.
    fn variance(&self) -> CskResult<f64>;

    /// Fill `chips` with one raw (uncentered) spreading sequence.
    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()>;

    /// Generate one raw spreading sequence of `length` chips.
    fn generate(&self, length: usize, rng: &mut dyn RngCore) -> CskResult<Vec<f64>> {
        let mut chips = vec![0.0; length];
        self.generate_into(&mut chips, rng)?;
        Ok(chips)
    }

    /// Generate `count` independent raw sequences of `length` chips each.
    fn sample_sequences(
        &self,
        length: usize,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> CskResult<Vec<Vec<f64>>> {
        (0..count).map(|_| self.generate(length, &mut *rng)).collect()
    }
}

/// Fill `chips` by iterating `map` from `seed`.
pub(crate) fn iterate_map(
    chips: &mut [f64],
    seed: f64,
    map: impl Fn(f64) -> CskResult<f64>,
) -> CskResult<()> {
    let Some(first) = chips.first_mut() else {
        return Ok(());
    };
    *first = seed;
    for i in 1..chips.len() {
        chips[i] = map(chips[i - 1])?;
    }
    Ok(())
}

/// A validated spreading generator together with its analytic moments.
///
/// Building a source is where configuration errors surface: invalid
/// parameters and undefined moments are both reported before any trial runs.
#[derive(Debug)]
pub struct SpreadingSource {
    strategy: Box<dyn Spreading>,
    mean: f64,
    variance: f64,
}

impl SpreadingSource {
    /// Initialize `family` with `params` and evaluate its moments.
    pub fn new(family: SpreadingFamily, params: &[f64]) -> CskResult<Self> {
        Self::from_strategy(family.initialize(params)?)
    }

    /// Wrap an existing generator.
    pub fn from_strategy(strategy: Box<dyn Spreading>) -> CskResult<Self> {
        let mean = strategy.mean()?;
        let variance = strategy.variance()?;
        Ok(Self {
            strategy,
            mean,
            variance,
        })
    }

    pub fn family(&self) -> SpreadingFamily {
        self.strategy.family()
    }

    pub fn params(&self) -> Vec<f64> {
        self.strategy.params()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Generate a raw (uncentered) sequence.
    pub fn generate(&self, length: usize, rng: &mut dyn RngCore) -> CskResult<Vec<f64>> {
        self.strategy.generate(length, rng)
    }

    /// Fill `chips` with a sequence centered on the theoretical mean.
    pub fn centered_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        self.strategy.generate_into(chips, rng)?;
        center(chips, self.mean);
        Ok(())
    }

    /// Generate a sequence centered on the theoretical mean.
    pub fn generate_centered(&self, length: usize, rng: &mut dyn RngCore) -> CskResult<Vec<f64>> {
        let mut chips = vec![0.0; length];
        self.centered_into(&mut chips, rng)?;
        Ok(chips)
    }
}

/// Subtract `mean` from every chip.
pub fn center(chips: &mut [f64], mean: f64) {
    chips.iter_mut().for_each(|chip| *chip -= mean);
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Sample mean and (biased) variance.
    pub fn sample_moments(samples: &[f64]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    /// Pool `count` independent sequences of `length` chips.
    pub fn pooled(spreading: &dyn Spreading, length: usize, count: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut all = Vec::with_capacity(length * count);
        for _ in 0..count {
            all.extend(spreading.generate(length, &mut rng).unwrap());
        }
        all
    }

    /// Assert that sample moments match the analytic ones.
    pub fn assert_moments(spreading: &dyn Spreading, samples: &[f64], mean_tol: f64, var_tol: f64) {
        let (mean, var) = sample_moments(samples);
        let expected_mean = spreading.mean().unwrap();
        let expected_var = spreading.variance().unwrap();
        assert!(
            (mean - expected_mean).abs() < mean_tol,
            "{}: sample mean {} vs {}",
            spreading.family(),
            mean,
            expected_mean
        );
        assert!(
            (var - expected_var).abs() < var_tol,
            "{}: sample variance {} vs {}",
            spreading.family(),
            var,
            expected_var
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_family_names_round_trip() {
        for family in SpreadingFamily::ALL {
            assert_eq!(family.name().parse::<SpreadingFamily>().unwrap(), family);
        }
        assert!(matches!(
            "cauchy".parse::<SpreadingFamily>(),
            Err(CskError::UnknownFamily { .. })
        ));
    }

    #[test]
    fn test_family_serde_names() {
        let family: SpreadingFamily = serde_yaml::from_str("negbernoulli").unwrap();
        assert_eq!(family, SpreadingFamily::NegativeBernoulli);
        assert_eq!(serde_yaml::to_string(&SpreadingFamily::Pbcs).unwrap().trim(), "pbcs");
    }

    #[test]
    fn test_every_family_initializes_with_defaults() {
        for family in SpreadingFamily::ALL {
            let spreading = family.initialize(&[]).unwrap();
            assert_eq!(spreading.family(), family);
            assert!(!spreading.params().is_empty() || family == SpreadingFamily::Logistic);
        }
    }

    #[test]
    fn test_source_rejects_undefined_moments() {
        // Student's t with one degree of freedom has no mean
        let err = SpreadingSource::new(SpreadingFamily::Student, &[]).unwrap_err();
        assert!(matches!(err, CskError::UndefinedMoment { moment: "mean", .. }));
    }

    #[test]
    fn test_centered_sequence_is_shifted_by_mean() {
        let source = SpreadingSource::new(SpreadingFamily::Pbcs, &[3.0]).unwrap();
        let mut a = StdRng::seed_from_u64(11);
        let mut b = StdRng::seed_from_u64(11);
        let raw = source.generate(16, &mut a).unwrap();
        let centered = source.generate_centered(16, &mut b).unwrap();
        for (r, c) in raw.iter().zip(&centered) {
            assert!((r - 3.0 - c).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sample_sequences_shape() {
        let spreading = SpreadingFamily::Logistic.initialize(&[]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let seqs = spreading.sample_sequences(7, 3, &mut rng).unwrap();
        assert_eq!(seqs.len(), 3);
        assert!(seqs.iter().all(|s| s.len() == 7));
        // Independent seeds give distinct sequences
        assert_ne!(seqs[0], seqs[1]);
    }

    #[test]
    fn test_single_sequence_moments() {
        use super::test_util::assert_moments;

        // (family, params, mean tolerance, variance tolerance), about five
        // standard errors of a 1000-chip sequence
        let cases: [(SpreadingFamily, &[f64], f64, f64); 10] = [
            (SpreadingFamily::Bernoulli, &[], 0.08, 0.025),
            (SpreadingFamily::NegativeBernoulli, &[], 0.08, 0.025),
            (SpreadingFamily::Tent, &[], 0.08, 0.025),
            (SpreadingFamily::Valley, &[], 0.08, 0.025),
            (SpreadingFamily::Circular, &[], 0.12, 0.1),
            (SpreadingFamily::Logistic, &[], 0.06, 0.03),
            (SpreadingFamily::Pbcs, &[], 0.12, 0.1),
            (SpreadingFamily::Normal, &[], 0.16, 0.22),
            (SpreadingFamily::Gumbel, &[], 0.2, 0.55),
            (SpreadingFamily::Student, &[10.0], 0.18, 0.35),
        ];
        for (i, (family, params, mean_tol, var_tol)) in cases.into_iter().enumerate() {
            let spreading = family.initialize(params).unwrap();
            let mut rng = StdRng::seed_from_u64(7 + i as u64);
            let chips = spreading.generate(1000, &mut rng).unwrap();
            assert_moments(spreading.as_ref(), &chips, mean_tol, var_tol);
            assert!(
                chips[900..].windows(2).any(|w| w[0] != w[1]),
                "{family}: constant tail"
            );
        }
    }

    #[test]
    fn test_empty_sequence() {
        let source = SpreadingSource::new(SpreadingFamily::Tent, &[]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(source.generate(0, &mut rng).unwrap().is_empty());
    }
}
