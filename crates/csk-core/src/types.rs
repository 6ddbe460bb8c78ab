//! Common types for CSK simulation
//!
//! The transmitted [`Bit`], the per-trial [`DecodeOutcome`] and the crate-wide
//! error type.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Antipodal information bit carried by one spreading sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Bit {
    /// -1
    Minus,
    /// +1
    Plus,
}

impl Bit {
    /// Bit as a ±1 multiplier.
    pub fn value(self) -> f64 {
        match self {
            Bit::Minus => -1.0,
            Bit::Plus => 1.0,
        }
    }

    /// The other bit.
    pub fn flipped(self) -> Self {
        match self {
            Bit::Minus => Bit::Plus,
            Bit::Plus => Bit::Minus,
        }
    }
}

impl Default for Bit {
    fn default() -> Self {
        Bit::Plus
    }
}

impl TryFrom<i32> for Bit {
    type Error = CskError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Bit::Minus),
            1 => Ok(Bit::Plus),
            other => Err(CskError::InvalidBit(other)),
        }
    }
}

impl From<Bit> for i32 {
    fn from(bit: Bit) -> Self {
        match bit {
            Bit::Minus => -1,
            Bit::Plus => 1,
        }
    }
}

impl std::fmt::Display for Bit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", i32::from(*self))
    }
}

/// Result of decoding one received symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The decoder committed to a bit.
    Estimate(Bit),
    /// The decision statistic was exactly zero (or not a number), so no
    /// bit could be chosen.
    Ambiguous,
}

impl DecodeOutcome {
    /// Map a decision statistic to an outcome by its sign.
    pub fn from_statistic(statistic: f64) -> Self {
        if statistic > 0.0 {
            DecodeOutcome::Estimate(Bit::Plus)
        } else if statistic < 0.0 {
            DecodeOutcome::Estimate(Bit::Minus)
        } else {
            DecodeOutcome::Ambiguous
        }
    }

    /// The estimated bit, if any.
    pub fn bit(self) -> Option<Bit> {
        match self {
            DecodeOutcome::Estimate(bit) => Some(bit),
            DecodeOutcome::Ambiguous => None,
        }
    }
}

/// Result type for simulation operations
pub type CskResult<T> = Result<T, CskError>;

/// Errors that can occur while configuring or running a simulation
#[derive(Debug, Clone, thiserror::Error)]
pub enum CskError {
    #[error("Invalid {family} parameters: {reason}")]
    Parameter { family: String, reason: String },

    #[error("The {moment} of the {family} distribution is undefined: {reason}")]
    UndefinedMoment {
        family: String,
        moment: &'static str,
        reason: String,
    },

    #[error("Argument {value} passed to the {map} map does not belong to the map's domain")]
    Domain { map: &'static str, value: f64 },

    #[error("Not possible to bracket the function from ({lower}, {middle}, {upper})")]
    Bracketing { lower: f64, middle: f64, upper: f64 },

    #[error("All {trials} decoding attempts failed")]
    AllDecodesFailed { trials: u64 },

    #[error("Unknown {kind} \"{name}\"")]
    UnknownFamily { kind: &'static str, name: String },

    #[error("Bit must be -1 or 1, got {0}")]
    InvalidBit(i32),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CskError {
    pub(crate) fn parameter(family: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        CskError::Parameter {
            family: family.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error only spoils the current trial's decode.
    ///
    /// Such trials are tallied as decode failures instead of aborting the
    /// BER point.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, CskError::Bracketing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_conversions() {
        assert_eq!(Bit::try_from(1).unwrap(), Bit::Plus);
        assert_eq!(Bit::try_from(-1).unwrap(), Bit::Minus);
        assert!(matches!(Bit::try_from(0), Err(CskError::InvalidBit(0))));
        assert_eq!(i32::from(Bit::Minus), -1);
        assert_eq!(Bit::Plus.flipped(), Bit::Minus);
        assert_eq!(Bit::Minus.value(), -1.0);
    }

    #[test]
    fn test_outcome_from_statistic() {
        assert_eq!(DecodeOutcome::from_statistic(0.3), DecodeOutcome::Estimate(Bit::Plus));
        assert_eq!(DecodeOutcome::from_statistic(-1e-300), DecodeOutcome::Estimate(Bit::Minus));
        assert_eq!(DecodeOutcome::from_statistic(0.0), DecodeOutcome::Ambiguous);
        assert_eq!(DecodeOutcome::from_statistic(-0.0), DecodeOutcome::Ambiguous);
        assert_eq!(DecodeOutcome::from_statistic(f64::NAN), DecodeOutcome::Ambiguous);
    }

    #[test]
    fn test_bit_serde() {
        let bit: Bit = serde_yaml::from_str("-1").unwrap();
        assert_eq!(bit, Bit::Minus);
        assert!(serde_yaml::from_str::<Bit>("2").is_err());
        assert_eq!(serde_yaml::to_string(&Bit::Plus).unwrap().trim(), "1");
    }

    #[test]
    fn test_only_bracketing_is_a_decode_failure() {
        let err = CskError::Bracketing { lower: 0.0, middle: 1.0, upper: 2.0 };
        assert!(err.is_decode_failure());
        assert!(!CskError::AllDecodesFailed { trials: 3 }.is_decode_failure());
        assert!(!CskError::Domain { map: "tent", value: 2.0 }.is_decode_failure());
    }
}
