//! BER Sweeps
//!
//! A sweep runs one BER point per (spreading length, noise value) pair of a
//! validated [`SimulationConfig`]. Points are independent: each builds its own
//! system and draws from its own random stream, derived from the sweep seed
//! and the point index, so the result does not depend on the order (or the
//! thread) in which points run.
//!
//! Result matrices are indexed `[noise][length]`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::ber::{BerEstimator, BerPoint};
use crate::config::{ConfigError, NoiseAxis, SimulationConfig};
use crate::spreading::SpreadingSource;
use crate::system::{CskSystem, Link, SymbolSimulator};
use crate::types::{CskError, CskResult};

/// Weyl increment used to spread point indices over the seed space.
const STREAM_INCREMENT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Independent random stream for grid point `index`.
pub fn point_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64 + 1).wrapping_mul(STREAM_INCREMENT))
}

/// One (length, noise value) pair of the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// Position in run order
    pub index: usize,
    pub length_index: usize,
    pub noise_index: usize,
    pub length: usize,
    /// Variance or SNR, depending on the sweep's noise axis
    pub noise_value: f64,
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResult {
    pub point: GridPoint,
    pub noise_variance: f64,
    pub snr_per_bit: f64,
    /// `None` when every trial failed to decode
    pub ber: Option<BerPoint>,
    pub decode_failures: u64,
    pub lower_bound: Option<f64>,
    pub elapsed: Duration,
}

/// Matrices of a finished sweep, indexed `[noise][length]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub seed: u64,
    pub axis: NoiseAxis,
    pub noise_values: Vec<f64>,
    pub lengths: Vec<usize>,
    pub ber: Vec<Vec<Option<f64>>>,
    pub decode_failures: Vec<Vec<u64>>,
    pub lower_bound: Option<Vec<Vec<f64>>>,
}

impl SweepResult {
    /// Points with no defined BER.
    pub fn undefined_points(&self) -> usize {
        self.ber.iter().flatten().filter(|b| b.is_none()).count()
    }
}

/// A validated sweep, ready to run.
#[derive(Debug, Clone)]
pub struct BerSweep {
    config: SimulationConfig,
    seed: u64,
    axis: NoiseAxis,
    noise_values: Vec<f64>,
    lengths: Vec<usize>,
}

impl BerSweep {
    /// Validate `config` and expand its grids.
    pub fn new(config: SimulationConfig, seed: u64) -> CskResult<Self> {
        config.validate()?;
        let lengths = config.lengths()?;
        let (axis, noise_values) = config.noise_grid()?;
        Ok(Self {
            config,
            seed,
            axis,
            noise_values,
            lengths,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn axis(&self) -> NoiseAxis {
        self.axis
    }

    /// Grid points, length-major.
    pub fn points(&self) -> Vec<GridPoint> {
        let per_length = self.noise_values.len();
        self.lengths
            .iter()
            .enumerate()
            .flat_map(|(length_index, &length)| {
                self.noise_values
                    .iter()
                    .enumerate()
                    .map(move |(noise_index, &noise_value)| GridPoint {
                        index: length_index * per_length + noise_index,
                        length_index,
                        noise_index,
                        length,
                        noise_value,
                    })
            })
            .collect()
    }

    /// Build the configured system for one grid point.
    pub fn build_system(&self, point: &GridPoint) -> CskResult<CskSystem> {
        let config = &self.config;
        let spreading = SpreadingSource::new(config.spreading.family, &config.spreading.params)?;
        let noise_variance = match self.axis {
            NoiseAxis::Variance => point.noise_value,
            NoiseAxis::SnrPerBit => crate::system::snr_to_noise_variance(
                point.noise_value,
                point.length,
                spreading.variance(),
            ),
        };
        let link = Link::new(
            config.bit,
            point.length,
            spreading,
            config.noise.family,
            noise_variance,
            &config.noise.params,
        )?;
        CskSystem::new(config.system, link, config.decoder.kind, config.decoder.mcml)
    }

    /// Simulate one grid point on its own stream.
    ///
    /// A point where every decode failed yields `ber: None`; other errors
    /// abort the sweep.
    pub fn run_point(&self, point: &GridPoint) -> CskResult<PointResult> {
        let start = Instant::now();
        let mut system = self.build_system(point)?;
        let mut rng = point_rng(self.seed, point.index);
        let link = system.link();
        let noise_variance = link.noise_variance();
        let snr_per_bit = link.snr_per_bit();

        info!(
            index = point.index,
            length = point.length,
            snr_per_bit,
            noise_variance,
            "BER point started"
        );

        let estimator = BerEstimator::new(self.config.trials);
        let (ber, decode_failures) = match estimator.run(&mut system, &mut rng) {
            Ok(ber) => (Some(ber), ber.decode_failures),
            Err(CskError::AllDecodesFailed { trials }) => {
                warn!(
                    index = point.index,
                    length = point.length,
                    snr_per_bit,
                    "All decoding attempts failed, BER undefined"
                );
                (None, trials)
            }
            Err(e) => return Err(e),
        };

        let lower_bound = match (self.config.ber_lower_bound, system.lower_bound()) {
            (Some(kind), Some(bound)) => Some(bound.ber_lower_bound(kind)),
            _ => None,
        };

        Ok(PointResult {
            point: *point,
            noise_variance,
            snr_per_bit,
            ber,
            decode_failures,
            lower_bound,
            elapsed: start.elapsed(),
        })
    }

    /// Log the completion of `result` as number `completed` out of the sweep.
    pub(crate) fn report(&self, result: &PointResult, completed: &AtomicUsize) {
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.lengths.len() * self.noise_values.len();
        let percent = 100.0 * done as f64 / total as f64;
        match result.ber {
            Some(ber) => {
                let (ci_low, ci_high) = ber.confidence_interval(0.95);
                info!(
                    index = result.point.index,
                    length = result.point.length,
                    snr_per_bit = result.snr_per_bit,
                    ber = ber.ber,
                    ci_low,
                    ci_high,
                    decode_failures = result.decode_failures,
                    lower_bound = result.lower_bound,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    percent,
                    "BER point complete"
                );
            }
            None => info!(
                index = result.point.index,
                decode_failures = result.decode_failures,
                elapsed_ms = result.elapsed.as_millis() as u64,
                percent,
                "BER point complete"
            ),
        }
    }

    /// Run every point in order on the current thread.
    pub fn run(&self) -> CskResult<SweepResult> {
        let start = Instant::now();
        let completed = AtomicUsize::new(0);
        let results = self
            .points()
            .iter()
            .map(|point| {
                let result = self.run_point(point)?;
                self.report(&result, &completed);
                Ok(result)
            })
            .collect::<CskResult<Vec<_>>>()?;
        Ok(self.collect(results, start))
    }

    /// Assemble point results into matrices.
    pub(crate) fn collect(&self, results: Vec<PointResult>, start: Instant) -> SweepResult {
        let (rows, cols) = (self.noise_values.len(), self.lengths.len());
        let mut ber = vec![vec![None; cols]; rows];
        let mut decode_failures = vec![vec![0; cols]; rows];
        let mut lower_bound = self
            .config
            .ber_lower_bound
            .map(|_| vec![vec![f64::NAN; cols]; rows]);

        for result in &results {
            let (i, j) = (result.point.noise_index, result.point.length_index);
            ber[i][j] = result.ber.map(|b| b.ber);
            decode_failures[i][j] = result.decode_failures;
            if let (Some(matrix), Some(bound)) = (lower_bound.as_mut(), result.lower_bound) {
                matrix[i][j] = bound;
            }
        }

        let sweep = SweepResult {
            seed: self.seed,
            axis: self.axis,
            noise_values: self.noise_values.clone(),
            lengths: self.lengths.clone(),
            ber,
            decode_failures,
            lower_bound,
        };
        info!(
            points = results.len(),
            undefined = sweep.undefined_points(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sweep complete"
        );
        sweep
    }
}

/// Raw spreading sequences for one length.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadingSample {
    pub length: usize,
    /// `sequences[k]` is the k-th sequence
    pub sequences: Vec<Vec<f64>>,
}

/// Generate `spreading.sequences` raw sequences per configured length.
pub fn sample_spreading(config: &SimulationConfig, seed: u64) -> CskResult<Vec<SpreadingSample>> {
    let lengths = config.lengths()?;
    if lengths.is_empty() || lengths.iter().any(|&l| l == 0) || config.spreading.sequences == 0 {
        return Err(ConfigError::Validation(
            "spreading lengths and sequence count must be > 0".to_string(),
        )
        .into());
    }
    // Raw sequences only: families with undefined moments can still be sampled
    let strategy = config.spreading.family.initialize(&config.spreading.params)?;
    lengths
        .iter()
        .enumerate()
        .map(|(index, &length)| {
            let mut rng = point_rng(seed, index);
            let sequences = strategy.sample_sequences(length, config.spreading.sequences, &mut rng)?;
            info!(length, sequences = sequences.len(), "Generated spreading sequences");
            Ok(SpreadingSample { length, sequences })
        })
        .collect()
}
