//! One-dimensional Minimization
//!
//! Derivative-free search for a minimum of `f: ℝ → ℝ` in two stages:
//!
//! 1. [`bracket`] walks downhill from two starting abscissae, growing the
//!    step by the golden ratio and by inverse parabolic extrapolation, until
//!    it holds a triple `(lower, middle, upper)` with
//!    `f(lower) > f(middle) < f(upper)`.
//! 2. [`GoldenSection::minimize`] shrinks that triple by the golden ratio
//!    until its width falls under a relative tolerance.
//!
//! The result is a local minimum; for a unimodal function it is the minimum.
//!
//! ```rust
//! use csk_core::minimize::{bracket, GoldenSection};
//!
//! let mut f = |x: f64| (x - 3.0).powi(2);
//! let triple = bracket(&mut f, 0.0, 1.0).unwrap();
//! let min = GoldenSection::default().minimize(&mut f, &triple);
//! assert!((min.x - 3.0).abs() < 1e-6);
//! ```

use tracing::trace;

use crate::types::{CskError, CskResult};

/// Growth factor between successive bracketing steps
pub const GOLDEN_RATIO: f64 = 1.618_034;
/// Largest parabolic step, as a multiple of the current step
pub const MAX_EXTRAPOLATION: f64 = 100.0;
/// Floor on the parabolic denominator
pub const DENOMINATOR_FLOOR: f64 = 1e-20;
/// Bracketing gives up after this many steps
pub const MAX_BRACKET_STEPS: usize = 500;

/// Golden-section interior ratio
const R: f64 = 0.618_033_99;
const C: f64 = 1.0 - R;

/// Three abscissae with `f(lower) > f(middle) < f(upper)`.
///
/// `middle` lies between `lower` and `upper`, but the triple may be ordered
/// either way along the real line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
    pub f_lower: f64,
    pub f_middle: f64,
    pub f_upper: f64,
}

impl Bracket {
    /// Whether the triple still brackets a minimum.
    pub fn is_valid(&self) -> bool {
        let between = (self.lower < self.middle && self.middle < self.upper)
            || (self.lower > self.middle && self.middle > self.upper);
        between && self.f_lower > self.f_middle && self.f_middle < self.f_upper
    }

    fn error(&self) -> CskError {
        CskError::Bracketing {
            lower: self.lower,
            middle: self.middle,
            upper: self.upper,
        }
    }
}

/// Search downhill from `lower` and `middle` for a bracketing triple.
///
/// The two points are swapped when needed so the search runs towards the
/// lower function value. Fails with [`CskError::Bracketing`] when the function
/// never turns back up (monotone, constant, or overflowing).
pub fn bracket<F>(f: &mut F, lower: f64, middle: f64) -> CskResult<Bracket>
where
    F: FnMut(f64) -> f64,
{
    let (mut a, mut b) = (lower, middle);
    let (mut fa, mut fb) = (f(a), f(b));
    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut c = b + GOLDEN_RATIO * (b - a);
    let mut fc = f(c);

    let mut steps = 0;
    while fb > fc {
        steps += 1;
        if steps > MAX_BRACKET_STEPS {
            break;
        }

        // Parabola through (a, fa), (b, fb), (c, fc)
        let r = (b - a) * (fb - fc);
        let q = (b - c) * (fb - fa);
        let denominator = 2.0 * (q - r).abs().max(DENOMINATOR_FLOOR).copysign(q - r);
        let mut u = b - ((b - c) * q - (b - a) * r) / denominator;
        let limit = b + MAX_EXTRAPOLATION * (c - b);
        let mut fu;

        if (b - u) * (u - c) > 0.0 {
            // Between middle and upper
            fu = f(u);
            if fu < fc {
                let found = Bracket {
                    lower: b,
                    middle: u,
                    upper: c,
                    f_lower: fb,
                    f_middle: fu,
                    f_upper: fc,
                };
                return finish(found);
            } else if fu > fb {
                let found = Bracket {
                    lower: a,
                    middle: b,
                    upper: u,
                    f_lower: fa,
                    f_middle: fb,
                    f_upper: fu,
                };
                return finish(found);
            }
            u = c + GOLDEN_RATIO * (c - b);
            fu = f(u);
        } else if (c - u) * (u - limit) > 0.0 {
            // Beyond upper, within the extrapolation limit
            fu = f(u);
            if fu < fc {
                b = c;
                c = u;
                u = c + GOLDEN_RATIO * (c - b);
                fb = fc;
                fc = fu;
                fu = f(u);
            }
        } else if (u - limit) * (limit - c) >= 0.0 {
            u = limit;
            fu = f(u);
        } else {
            u = c + GOLDEN_RATIO * (c - b);
            fu = f(u);
        }

        a = b;
        b = c;
        c = u;
        fa = fb;
        fb = fc;
        fc = fu;
    }

    finish(Bracket {
        lower: a,
        middle: b,
        upper: c,
        f_lower: fa,
        f_middle: fb,
        f_upper: fc,
    })
}

fn finish(found: Bracket) -> CskResult<Bracket> {
    if found.is_valid() {
        trace!(?found, "Bracketed minimum");
        Ok(found)
    } else {
        Err(found.error())
    }
}

/// A located minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    /// Abscissa of the minimum
    pub x: f64,
    /// Function value at `x`
    pub value: f64,
    /// Golden-section reductions performed
    pub iterations: usize,
}

/// Golden-section search over a [`Bracket`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoldenSection {
    /// Relative width at which the search stops
    pub tolerance: f64,
    /// Hard cap on reductions
    pub max_iterations: usize,
}

impl Default for GoldenSection {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1000,
        }
    }
}

impl GoldenSection {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Default::default()
        }
    }

    /// Shrink `bracket` until `|x3 − x0| ≤ tolerance·(|x1| + |x2|)`.
    ///
    /// Each reduction evaluates `f` once.
    pub fn minimize<F>(&self, f: &mut F, bracket: &Bracket) -> Minimum
    where
        F: FnMut(f64) -> f64,
    {
        let (ax, bx, cx) = (bracket.lower, bracket.middle, bracket.upper);
        let mut x0 = ax;
        let mut x3 = cx;
        // Split the larger half
        let (mut x1, mut x2, mut f1, mut f2) = if (cx - bx).abs() > (bx - ax).abs() {
            let x2 = bx + C * (cx - bx);
            (bx, x2, bracket.f_middle, f(x2))
        } else {
            let x1 = bx - C * (bx - ax);
            (x1, bx, f(x1), bracket.f_middle)
        };

        let mut iterations = 0;
        while (x3 - x0).abs() > self.tolerance * (x1.abs() + x2.abs())
            && iterations < self.max_iterations
        {
            iterations += 1;
            if f2 < f1 {
                x0 = x1;
                x1 = x2;
                x2 = R * x2 + C * x3;
                f1 = f2;
                f2 = f(x2);
            } else {
                x3 = x2;
                x2 = x1;
                x1 = R * x1 + C * x0;
                f2 = f1;
                f1 = f(x1);
            }
        }

        let minimum = if f1 < f2 {
            Minimum { x: x1, value: f1, iterations }
        } else {
            Minimum { x: x2, value: f2, iterations }
        };
        trace!(?minimum, "Golden-section search finished");
        minimum
    }
}
