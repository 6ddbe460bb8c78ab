//! Parallel Sweeps
//!
//! Runs the grid points of a [`BerSweep`] on the rayon thread pool.
//! Enable with the `parallel` feature flag.
//!
//! Each point already owns an independent random stream, so a parallel run
//! produces exactly the matrices of [`BerSweep::run`]; only the order of the
//! log events differs.

use std::sync::atomic::AtomicUsize;
use std::time::Instant;

use rayon::prelude::*;

use crate::sweep::{BerSweep, SweepResult};
use crate::types::CskResult;

/// Parallel runner for BER sweeps
pub struct ParallelSweep<'a> {
    sweep: &'a BerSweep,
    threads: Option<usize>,
}

impl<'a> ParallelSweep<'a> {
    /// Use the global rayon pool.
    pub fn new(sweep: &'a BerSweep) -> Self {
        Self {
            sweep,
            threads: None,
        }
    }

    /// Use a dedicated pool of `threads` workers.
    pub fn with_threads(sweep: &'a BerSweep, threads: usize) -> Self {
        Self {
            sweep,
            threads: Some(threads),
        }
    }

    /// Run all grid points, stopping at the first hard error.
    pub fn run(&self) -> CskResult<SweepResult> {
        match self.threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(|| self.run_points()),
                Err(e) => {
                    tracing::warn!(error = %e, "Falling back to the global thread pool");
                    self.run_points()
                }
            },
            None => self.run_points(),
        }
    }

    fn run_points(&self) -> CskResult<SweepResult> {
        let start = Instant::now();
        let completed = AtomicUsize::new(0);
        let results = self
            .sweep
            .points()
            .par_iter()
            .map(|point| {
                let result = self.sweep.run_point(point)?;
                self.sweep.report(&result, &completed);
                Ok(result)
            })
            .collect::<CskResult<Vec<_>>>()?;
        Ok(self.sweep.collect(results, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    #[test]
    fn test_parallel_matches_sequential() {
        let config = SimulationConfig::parse(
            "trials: 400\nspreading: {family: tent, lengths: [8, 16]}\nnoise: {snr_per_bit: {start: 0, end: 6, step: 3}}",
        )
        .unwrap();
        let sweep = BerSweep::new(config, 31).unwrap();
        let sequential = sweep.run().unwrap();
        let parallel = ParallelSweep::with_threads(&sweep, 3).run().unwrap();
        assert_eq!(parallel, sequential);
        assert_eq!(ParallelSweep::new(&sweep).run().unwrap(), sequential);
    }
}
