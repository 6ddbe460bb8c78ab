//! Grid values for sweeps
//!
//! Spreading lengths, noise variances and SNRs are given either as explicit
//! lists or as inclusive `start..=end` ranges with a positive step, walked
//! downwards when `start > end`.
//!
//! ```rust
//! use csk_core::sequence::{generate_sequence, Grid};
//!
//! assert_eq!(generate_sequence(10usize, 4, 3).unwrap(), vec![10, 7, 4]);
//! let snr = Grid::from_args(&[0.0, 1.0, 0.25]).unwrap();
//! assert_eq!(snr.values().unwrap().len(), 5);
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{CskError, CskResult};

/// Most values a range may expand to.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Scalar types a grid can range over.
pub trait GridValue: Copy + PartialOrd + std::fmt::Debug {
    fn one() -> Self;

    fn is_positive(self) -> bool;

    /// Number of steps of size `step` that fit between `a` and `b`.
    fn steps_between(a: Self, b: Self, step: Self) -> usize;

    /// `start ± i·step`
    fn nth(start: Self, step: Self, i: usize, descending: bool) -> Self;
}

impl GridValue for f64 {
    fn one() -> Self {
        1.0
    }

    fn is_positive(self) -> bool {
        self > 0.0 && self.is_finite()
    }

    fn steps_between(a: Self, b: Self, step: Self) -> usize {
        // Slack absorbs representation error in decimal steps
        ((a - b).abs() / step + 1e-9).floor() as usize
    }

    fn nth(start: Self, step: Self, i: usize, descending: bool) -> Self {
        let offset = i as f64 * step;
        if descending {
            start - offset
        } else {
            start + offset
        }
    }
}

impl GridValue for usize {
    fn one() -> Self {
        1
    }

    fn is_positive(self) -> bool {
        self > 0
    }

    fn steps_between(a: Self, b: Self, step: Self) -> usize {
        a.abs_diff(b) / step
    }

    fn nth(start: Self, step: Self, i: usize, descending: bool) -> Self {
        if descending {
            start - i * step
        } else {
            start + i * step
        }
    }
}

/// Inclusive sequence from `start` to `end` by `step`.
pub fn generate_sequence<T: GridValue>(start: T, end: T, step: T) -> CskResult<Vec<T>> {
    if !step.is_positive() {
        return Err(CskError::parameter(
            "grid",
            format!("the step must be positive, got {step:?}"),
        ));
    }
    if start.partial_cmp(&end).is_none() {
        return Err(CskError::parameter("grid", "bounds must be comparable"));
    }
    let descending = start > end;
    let count = T::steps_between(start, end, step)
        .checked_add(1)
        .filter(|&n| n <= MAX_GRID_POINTS)
        .ok_or_else(|| {
            CskError::parameter(
                "grid",
                format!("{start:?}..={end:?} by {step:?} exceeds {MAX_GRID_POINTS} values"),
            )
        })?;
    Ok((0..count).map(|i| T::nth(start, step, i, descending)).collect())
}

/// Grid of sweep values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de> + GridValue"))]
pub enum Grid<T> {
    Single(T),
    List(Vec<T>),
    Range {
        start: T,
        end: T,
        #[serde(default = "GridValue::one")]
        step: T,
    },
}

impl<T: GridValue> Grid<T> {
    /// Grid from one value, a `(start, end)` pair stepping by one, or a
    /// `(start, end, step)` triple.
    pub fn from_args(args: &[T]) -> CskResult<Self> {
        match *args {
            [value] => Ok(Grid::Single(value)),
            [start, end] => Ok(Grid::Range {
                start,
                end,
                step: T::one(),
            }),
            [start, end, step] => Ok(Grid::Range { start, end, step }),
            _ => Err(CskError::parameter(
                "grid",
                format!("expected 1 to 3 values, got {}", args.len()),
            )),
        }
    }

    /// Expand to the list of values.
    pub fn values(&self) -> CskResult<Vec<T>> {
        match self {
            Grid::Single(value) => Ok(vec![*value]),
            Grid::List(values) => Ok(values.clone()),
            Grid::Range { start, end, step } => generate_sequence(*start, *end, *step),
        }
    }
}
