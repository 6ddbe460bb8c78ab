//! # Simulation Configuration
//!
//! A simulation is described by one YAML document:
//!
//! ```yaml
//! seed: 42
//! trials: 10000
//! system: coherent
//! bit: 1
//! spreading:
//!   family: logistic
//!   lengths: [31, 63]
//! noise:
//!   family: white
//!   snr_per_bit: {start: 0, end: 10, step: 2}
//! decoder:
//!   kind: corr
//! ber_lower_bound: jensen
//! output:
//!   root: ./output
//! ```
//!
//! Every section has defaults, so a document only needs the fields it
//! changes. [`SimulationConfig::validate`] applies the cross-field rules
//! before anything is simulated.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::logging::LogConfig;
use crate::noise::NoiseFamily;
use crate::sequence::Grid;
use crate::spreading::{SpreadingFamily, SpreadingSource};
use crate::system::{snr_to_noise_variance, DecoderKind, LowerBoundKind, McmlSettings, SystemKind};
use crate::types::{Bit, CskResult};

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config: {0}")]
    Read(String),
    /// Failed to parse the configuration
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// Invalid configuration value
    #[error("invalid config: {0}")]
    Validation(String),
    /// Failed to write the configuration
    #[error("failed to write config: {0}")]
    Write(String),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

/// Spreading section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadingConfig {
    pub family: SpreadingFamily,
    /// Family parameters; empty selects the family defaults
    pub params: Vec<f64>,
    /// Spreading lengths to sweep
    pub lengths: Grid<usize>,
    /// Sequences per length written in spreading mode
    pub sequences: usize,
}

impl Default for SpreadingConfig {
    fn default() -> Self {
        Self {
            family: SpreadingFamily::Logistic,
            params: Vec::new(),
            lengths: Grid::Single(31),
            sequences: 1,
        }
    }
}

/// Noise section. Exactly one of `variance` and `snr_per_bit` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub family: NoiseFamily,
    /// Noise variances to sweep
    pub variance: Option<Grid<f64>>,
    /// Per-bit SNRs in dB to sweep
    pub snr_per_bit: Option<Grid<f64>>,
    /// Extra family parameters
    pub params: Vec<f64>,
}

/// Noise axis of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseAxis {
    Variance,
    SnrPerBit,
}

impl NoiseAxis {
    /// Column header of the axis in result tables.
    pub fn label(self) -> &'static str {
        match self {
            NoiseAxis::Variance => "NoiseVariance",
            NoiseAxis::SnrPerBit => "SNR",
        }
    }
}

/// Decoder section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub kind: DecoderKind,
    /// Required by, and only allowed with, the `mcml` decoder
    pub mcml: Option<McmlSettings>,
}

/// Output section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path prefix of every output file
    pub root: PathBuf,
    /// Column delimiter
    pub delimiter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./output"),
            delimiter: "\t".to_string(),
        }
    }
}

impl OutputConfig {
    /// `<root><suffix>`
    pub fn path(&self, suffix: &str) -> PathBuf {
        let mut name = self.root.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of the random stream; chosen at startup when absent
    pub seed: Option<u64>,
    /// Monte Carlo trials per BER point
    pub trials: u64,
    pub system: SystemKind,
    pub bit: Bit,
    pub spreading: SpreadingConfig,
    pub noise: NoiseConfig,
    pub decoder: DecoderConfig,
    pub ber_lower_bound: Option<LowerBoundKind>,
    pub output: OutputConfig,
    pub logging: LogConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            trials: 10_000,
            system: SystemKind::Coherent,
            bit: Bit::Plus,
            spreading: SpreadingConfig::default(),
            noise: NoiseConfig {
                snr_per_bit: Some(Grid::Single(5.0)),
                ..Default::default()
            },
            decoder: DecoderConfig::default(),
            ber_lower_bound: None,
            output: OutputConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded configuration");
        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_yaml()?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Write(format!("{}: {}", path.display(), e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Expanded spreading lengths.
    pub fn lengths(&self) -> CskResult<Vec<usize>> {
        self.spreading.lengths.values()
    }

    /// The noise axis and its expanded values.
    pub fn noise_grid(&self) -> CskResult<(NoiseAxis, Vec<f64>)> {
        match (&self.noise.variance, &self.noise.snr_per_bit) {
            (Some(grid), None) => Ok((NoiseAxis::Variance, grid.values()?)),
            (None, Some(grid)) => Ok((NoiseAxis::SnrPerBit, grid.values()?)),
            _ => Err(invalid("exactly one of noise.variance and noise.snr_per_bit must be set").into()),
        }
    }

    /// Check the cross-field rules. Spreading parameters are checked by
    /// building the spreading source, so undefined moments surface here too.
    pub fn validate(&self) -> CskResult<()> {
        if self.trials == 0 {
            return Err(invalid("trials must be > 0").into());
        }

        let lengths = self.lengths()?;
        if lengths.is_empty() {
            return Err(invalid("at least one spreading length is required").into());
        }
        if lengths.iter().any(|&l| l == 0) {
            return Err(invalid("spreading lengths must be > 0").into());
        }
        if self.spreading.sequences == 0 {
            return Err(invalid("spreading.sequences must be > 0").into());
        }
        let source = SpreadingSource::new(self.spreading.family, &self.spreading.params)?;

        let (axis, values) = self.noise_grid()?;
        if values.is_empty() {
            return Err(invalid("at least one noise grid value is required").into());
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid("noise grid values must be finite").into());
        }
        if axis == NoiseAxis::Variance && values.iter().any(|&v| v <= 0.0) {
            return Err(invalid("noise variances must be > 0").into());
        }
        if axis == NoiseAxis::SnrPerBit {
            for &length in &lengths {
                for &snr in &values {
                    let variance = snr_to_noise_variance(snr, length, source.variance());
                    if !(variance.is_finite() && variance > 0.0) {
                        return Err(invalid(format!(
                            "snr_per_bit {snr} dB at spreading length {length} gives noise variance {variance}"
                        ))
                        .into());
                    }
                }
            }
        }

        match (self.system, self.decoder.kind) {
            (SystemKind::Coherent, DecoderKind::Mcml) => {
                return Err(invalid("the coherent system supports only the corr decoder").into());
            }
            (_, DecoderKind::Mcml) => {
                let mcml = self
                    .decoder
                    .mcml
                    .as_ref()
                    .ok_or_else(|| invalid("the mcml decoder requires decoder.mcml"))?;
                if mcml.realizations == 0 {
                    return Err(invalid("decoder.mcml.realizations must be > 0").into());
                }
                if !(mcml.tolerance > 0.0) {
                    return Err(invalid("decoder.mcml.tolerance must be > 0").into());
                }
            }
            (_, DecoderKind::Correlation) => {
                if self.decoder.mcml.is_some() {
                    return Err(invalid("decoder.mcml is only valid with the mcml decoder").into());
                }
            }
        }

        if self.ber_lower_bound.is_some() && self.system != SystemKind::Coherent {
            return Err(invalid("ber_lower_bound is only available for the coherent system").into());
        }

        if self.output.delimiter.is_empty() {
            return Err(invalid("output.delimiter must not be empty").into());
        }

        Ok(())
    }

    /// Example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            seed: Some(42),
            spreading: SpreadingConfig {
                lengths: Grid::List(vec![31, 63]),
                ..Default::default()
            },
            noise: NoiseConfig {
                snr_per_bit: Some(Grid::Range {
                    start: 0.0,
                    end: 10.0,
                    step: 2.0,
                }),
                ..Default::default()
            },
            ber_lower_bound: Some(LowerBoundKind::Jensen),
            ..Default::default()
        };
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
