//! Two-branch piecewise-linear chaotic maps
//!
//! The Bernoulli, negative Bernoulli, tent and valley maps share one shape:
//! an interval `[a, b]` split at a knee `c`, with each branch stretched onto
//! the whole interval. They differ only in the direction of each branch.
//!
//! ```text
//!  bernoulli      negbernoulli    tent           valley
//!  b ┤  /   /     b ┤\   \        b ┤  /\        b ┤\    /
//!    │ /   /        │ \   \         │ /  \         │ \  /
//!  a ┤/   /       a ┤  \   \      a ┤/    \      a ┤  \/
//!    a    c  b      a    c  b       a  c  b        a c  b
//! ```
//!
//! Every branch is onto `[a, b]` with constant slope, so the invariant law is
//! uniform on `[a, b]` regardless of the knee position.
//!
//! In binary floating point each step discards as many seed bits as the
//! map's Lyapunov exponent (one bit for a centred knee), so an orbit with the
//! default parameters lands on an exact fixed point or 2-cycle after about
//! 53 chips. Sequences are therefore built from segments of
//! [`TwoBranchMap::segment_len`] chips, each iterated from a fresh seed drawn
//! from the uniform invariant law. A seed carries 52 random mantissa bits, so
//! every chip keeps about 20 bits of resolution.

use rand::{Rng, RngCore};

use super::{iterate_map, Spreading, SpreadingFamily};
use crate::types::{CskError, CskResult};

/// Default `[lower, knee, upper]`.
pub const DEFAULT_PARAMS: [f64; 3] = [0.0, 0.5, 1.0];

/// Seed bits an orbit segment may consume before it is re-seeded.
pub const PRECISION_BITS: f64 = 32.0;

/// Direction of the two branches of a [`TwoBranchMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branching {
    /// Rising, rising
    Bernoulli,
    /// Falling, falling
    NegativeBernoulli,
    /// Rising, falling
    Tent,
    /// Falling, rising
    Valley,
}

impl Branching {
    fn family(self) -> SpreadingFamily {
        match self {
            Branching::Bernoulli => SpreadingFamily::Bernoulli,
            Branching::NegativeBernoulli => SpreadingFamily::NegativeBernoulli,
            Branching::Tent => SpreadingFamily::Tent,
            Branching::Valley => SpreadingFamily::Valley,
        }
    }

    /// Whether the (left, right) branch rises.
    fn rising(self) -> (bool, bool) {
        match self {
            Branching::Bernoulli => (true, true),
            Branching::NegativeBernoulli => (false, false),
            Branching::Tent => (true, false),
            Branching::Valley => (false, true),
        }
    }
}

/// Piecewise-linear map on `[lower, upper]` with a knee.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBranchMap {
    branching: Branching,
    lower: f64,
    knee: f64,
    upper: f64,
}

impl TwoBranchMap {
    /// Validate `[lower, knee, upper]`; empty `params` selects the defaults.
    pub fn new(branching: Branching, params: &[f64]) -> CskResult<Self> {
        let family = branching.family();
        let params = if params.is_empty() { &DEFAULT_PARAMS[..] } else { params };
        let &[lower, knee, upper] = params else {
            return Err(CskError::parameter(
                family,
                format!("expected 3 parameters (lower, knee, upper), got {}", params.len()),
            ));
        };
        if params.iter().any(|p| !p.is_finite()) {
            return Err(CskError::parameter(family, "parameters must be finite"));
        }
        if !(lower < knee && knee < upper) {
            return Err(CskError::parameter(
                family,
                format!("parameters must be strictly increasing, got [{lower}, {knee}, {upper}]"),
            ));
        }
        Ok(Self {
            branching,
            lower,
            knee,
            upper,
        })
    }

    pub fn branching(&self) -> Branching {
        self.branching
    }

    /// Lyapunov exponent in bits per iteration.
    ///
    /// Under the uniform law the left branch is visited with probability
    /// `p = (c - a)/(b - a)` and stretches by `1/p`, so this is the binary
    /// entropy of `p`.
    pub fn lyapunov_bits(&self) -> f64 {
        let p = (self.knee - self.lower) / (self.upper - self.lower);
        let q = 1.0 - p;
        -(p * p.log2() + q * q.log2())
    }

    /// Chips iterated from one seed.
    pub fn segment_len(&self) -> usize {
        let len = (PRECISION_BITS / self.lyapunov_bits()).floor();
        if len.is_finite() && len >= 1.0 {
            len as usize
        } else {
            usize::MAX
        }
    }

    /// One application of the map.
    pub fn apply(&self, x: f64) -> CskResult<f64> {
        let (a, c, b) = (self.lower, self.knee, self.upper);
        if !(a..=b).contains(&x) {
            return Err(CskError::Domain {
                map: self.branching.family().name(),
                value: x,
            });
        }
        let width = b - a;
        let (left_rising, right_rising) = self.branching.rising();
        let (fraction, rising) = if x < c {
            ((x - a) / (c - a), left_rising)
        } else {
            ((x - c) / (b - c), right_rising)
        };
        let image = if rising { a + width * fraction } else { b - width * fraction };
        Ok(image.clamp(a, b))
    }
}

impl Spreading for TwoBranchMap {
    fn family(&self) -> SpreadingFamily {
        self.branching.family()
    }

    fn params(&self) -> Vec<f64> {
        vec![self.lower, self.knee, self.upper]
    }

    fn mean(&self) -> CskResult<f64> {
        Ok((self.lower + self.upper) / 2.0)
    }

    fn variance(&self) -> CskResult<f64> {
        Ok((self.upper - self.lower).powi(2) / 12.0)
    }

    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        for segment in chips.chunks_mut(self.segment_len()) {
            let seed = rng.gen_range(self.lower..self.upper);
            iterate_map(segment, seed, |x| self.apply(x))?;
        }
        Ok(())
    }
}
