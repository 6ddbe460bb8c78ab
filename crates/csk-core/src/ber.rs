//! Monte Carlo BER Estimation
//!
//! Runs a [`SymbolSimulator`] for a fixed number of trials and tallies bit
//! errors and decode failures. A failed decode (tied statistic, or a
//! bracketing failure of the ML search) is not a bit error: the BER is taken
//! over the trials that produced an estimate.
//!
//! ```text
//! BER = bit_errors / (trials − decode_failures)
//! ```

use rand::RngCore;
use tracing::debug;

use crate::system::coherent::standard_normal_cdf;
use crate::system::SymbolSimulator;
use crate::types::{Bit, CskError, CskResult, DecodeOutcome};

/// Per-point counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BerAccumulator {
    pub trials: u64,
    pub decode_failures: u64,
    pub bit_errors: u64,
}

impl BerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally one decoded trial against the transmitted bit.
    pub fn record(&mut self, outcome: DecodeOutcome, transmitted: Bit) {
        self.trials += 1;
        match outcome {
            DecodeOutcome::Estimate(bit) if bit != transmitted => self.bit_errors += 1,
            DecodeOutcome::Estimate(_) => {}
            DecodeOutcome::Ambiguous => self.decode_failures += 1,
        }
    }

    /// Tally a trial whose decode failed outright.
    pub fn record_failure(&mut self) {
        self.trials += 1;
        self.decode_failures += 1;
    }

    /// Trials that produced an estimate.
    pub fn decoded(&self) -> u64 {
        self.trials - self.decode_failures
    }

    /// Close the point. Fails when no trial decoded.
    pub fn finish(self) -> CskResult<BerPoint> {
        let decoded = self.decoded();
        if decoded == 0 {
            return Err(CskError::AllDecodesFailed {
                trials: self.trials,
            });
        }
        Ok(BerPoint {
            ber: self.bit_errors as f64 / decoded as f64,
            trials: self.trials,
            decode_failures: self.decode_failures,
            bit_errors: self.bit_errors,
        })
    }
}

/// BER estimate for one grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BerPoint {
    pub ber: f64,
    pub trials: u64,
    pub decode_failures: u64,
    pub bit_errors: u64,
}

impl BerPoint {
    /// Standard error of the estimate.
    pub fn standard_error(&self) -> f64 {
        let n = (self.trials - self.decode_failures) as f64;
        (self.ber * (1.0 - self.ber) / n).sqrt()
    }

    /// Normal-approximation confidence interval on the BER.
    pub fn confidence_interval(&self, confidence: f64) -> (f64, f64) {
        let margin = z_score(confidence) * self.standard_error();
        ((self.ber - margin).max(0.0), (self.ber + margin).min(1.0))
    }
}

/// Two-sided normal quantile for `confidence`: the `z` with
/// `Φ(−z) = (1 − confidence)/2`, bisected on the same `erfc`-based CDF as
/// the coherent lower bound.
fn z_score(confidence: f64) -> f64 {
    let tail = (1.0 - confidence.clamp(0.0, 1.0)) / 2.0;
    let (mut lo, mut hi) = (0.0, 40.0);
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if standard_normal_cdf(-mid) > tail {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Drives a simulator through `trials` sequential trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BerEstimator {
    pub trials: u64,
}

impl BerEstimator {
    pub fn new(trials: u64) -> Self {
        Self { trials }
    }

    /// Run every trial in order on `rng`.
    ///
    /// Decode failures are counted and skipped; any other error aborts the
    /// point. Fails with [`CskError::AllDecodesFailed`] when no trial decoded.
    pub fn run<S>(&self, system: &mut S, rng: &mut dyn RngCore) -> CskResult<BerPoint>
    where
        S: SymbolSimulator + ?Sized,
    {
        let transmitted = system.transmitted_bit();
        let mut acc = BerAccumulator::new();
        for trial in 0..self.trials {
            match system.simulate_symbol(rng) {
                Ok(outcome) => acc.record(outcome, transmitted),
                Err(e) if e.is_decode_failure() => {
                    debug!(trial, error = %e, "Decode failed");
                    acc.record_failure();
                }
                Err(e) => return Err(e),
            }
        }
        acc.finish()
    }
}
