//! # CSK BER Simulation Library
//!
//! Monte Carlo estimation of the bit error rate of chaos shift keying (CSK)
//! links under additive noise.
//!
//! ## Overview
//!
//! A CSK transmitter spreads each bit over `L` chips of a chaotic or random
//! sequence. This library provides:
//!
//! - **Spreading**: ten sequence families with analytic moments
//! - **Noise**: white Gaussian noise
//! - **Receivers**: coherent correlation, non-coherent correlation, and
//!   non-coherent Monte-Carlo maximum likelihood (MCML)
//! - **Minimization**: bracketing and golden-section search for the MCML decoder
//! - **Estimation**: BER with decode-failure accounting, swept over lengths
//!   and SNRs, optionally in parallel
//!
//! ## Signal Flow
//!
//! ```text
//! Spreading → center → × bit → + noise → decoder → estimate → BER tally
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use csk_core::{BerSweep, SimulationConfig};
//!
//! let config = SimulationConfig::parse(
//!     "trials: 1000\nspreading: {family: tent, lengths: [31]}\nnoise: {snr_per_bit: [5.0]}",
//! ).unwrap();
//! let sweep = BerSweep::new(config, 42).unwrap();
//! let result = sweep.run().unwrap();
//! println!("BER = {:?}", result.ber[0][0]);
//! ```

pub mod ber;
pub mod config;
pub mod logging;
pub mod minimize;
pub mod noise;
pub mod sequence;
pub mod spreading;
pub mod sweep;
pub mod system;
pub mod types;

// Parallel sweeps (requires `parallel` feature)
#[cfg(feature = "parallel")]
pub mod parallel;

// Re-export main types
pub use ber::{BerAccumulator, BerEstimator, BerPoint};
pub use config::{ConfigError, NoiseAxis, SimulationConfig};
pub use noise::{Noise, NoiseFamily, WhiteNoise};
pub use spreading::{Spreading, SpreadingFamily, SpreadingSource};
pub use sweep::{BerSweep, GridPoint, PointResult, SweepResult};
pub use system::{
    CoherentSystem, CskSystem, DecoderKind, Link, LowerBoundKind, McmlSettings,
    NonCoherentSystem, SymbolSimulator, SystemKind,
};
pub use types::{Bit, CskError, CskResult, DecodeOutcome};

#[cfg(feature = "parallel")]
pub use parallel::ParallelSweep;
