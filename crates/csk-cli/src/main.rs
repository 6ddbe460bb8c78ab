//! `csk` - Monte Carlo BER simulation of chaos shift keying links
//!
//! ```text
//! csk ber --spr tent --spr-len 10 100 10 --snr-per-bit 0 10 2 -o out/tent
//! csk ber -s sweep.yaml --sys noncoherent --dec mcml --n-mcml 200
//! csk spreading --spr logistic --spr-len 64 --spr-nseq 4
//! csk example > sweep.yaml
//! ```
//!
//! Command-line options override the YAML script.

mod output;

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use csk_core::logging::{init_logging, LogLevel};
use csk_core::sequence::Grid;
use csk_core::sweep::sample_spreading;
use csk_core::{
    Bit, BerSweep, DecoderKind, LowerBoundKind, McmlSettings, NoiseFamily, SimulationConfig,
    SpreadingFamily, SystemKind,
};

#[derive(Parser, Debug)]
#[command(name = "csk", version, about = "Monte Carlo BER simulation of chaos shift keying")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the BER over the spreading length and noise grids
    #[command(alias = "sim-ber")]
    Ber(RunArgs),

    /// Write raw spreading sequences for each spreading length
    #[command(alias = "sim-spr")]
    Spreading(RunArgs),

    /// Print an example YAML script
    Example,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// YAML script with the simulation settings
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Output root; files are written to <root>.<suffix>
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Column delimiter of the output matrices
    #[arg(long)]
    out_col_delim: Option<String>,

    /// Verbosity: 1 = info, 2 = debug
    #[arg(short, long)]
    verbose: Option<u8>,

    /// Seed of the random stream (default: derived from the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Monte Carlo trials per BER point
    #[arg(long)]
    n_ber: Option<u64>,

    /// Realizations of the Monte Carlo maximum-likelihood decoder (required with `--dec mcml`)
    #[arg(long, required_if_eq("dec", "mcml"))]
    n_mcml: Option<usize>,

    /// System: coherent or noncoherent
    #[arg(long)]
    sys: Option<SystemKind>,

    /// Transmitted bit: -1 or 1
    #[arg(long, value_parser = parse_bit, allow_negative_numbers = true)]
    bit: Option<Bit>,

    /// Noise family
    #[arg(long)]
    nse: Option<NoiseFamily>,

    /// Noise variance grid: value, start end, or start end step
    #[arg(long, num_args = 1..=3, allow_negative_numbers = true, conflicts_with = "snr_per_bit")]
    nse_var: Option<Vec<f64>>,

    /// SNR-per-bit grid in dB: value, start end, or start end step
    #[arg(long, num_args = 1..=3, allow_negative_numbers = true)]
    snr_per_bit: Option<Vec<f64>>,

    /// Extra noise parameters
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    nse_pars: Option<Vec<f64>>,

    /// Decoder: corr or mcml
    #[arg(long)]
    dec: Option<DecoderKind>,

    /// Initial two abscissae of the maximum-likelihood bracket search
    #[arg(long, num_args = 2, allow_negative_numbers = true)]
    mcml_brkt: Option<Vec<f64>>,

    /// Convergence tolerance of the maximum-likelihood search
    #[arg(long)]
    mcml_tol: Option<f64>,

    /// Also compute this BER lower bound (coherent system only)
    #[arg(long)]
    ber_lb: Option<LowerBoundKind>,

    /// Spreading family
    #[arg(long)]
    spr: Option<SpreadingFamily>,

    /// Spreading length grid: value, start end, or start end step
    #[arg(long, num_args = 1..=3)]
    spr_len: Option<Vec<usize>>,

    /// Spreading family parameters
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    spr_pars: Option<Vec<f64>>,

    /// Number of sequences written per length in spreading mode
    #[arg(long)]
    spr_nseq: Option<usize>,

    /// Worker threads for the parallel sweep (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Do not write <root>.log
    #[arg(long)]
    no_log_file: bool,
}

fn parse_bit(s: &str) -> Result<Bit, String> {
    let value: i32 = s.parse().map_err(|e| format!("{e}"))?;
    Bit::try_from(value).map_err(|e| e.to_string())
}

impl RunArgs {
    /// Load the script (or defaults) and apply the command-line overrides.
    fn into_config(self) -> Result<(SimulationConfig, Option<usize>), Box<dyn std::error::Error>> {
        let mut config = match &self.script {
            Some(path) => SimulationConfig::load_from(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(root) = self.out {
            config.output.root = root;
        }
        if let Some(delimiter) = self.out_col_delim {
            config.output.delimiter = delimiter;
        }
        if let Some(verbosity) = self.verbose {
            config.logging.level = LogLevel::from_verbosity(verbosity);
        }
        if self.no_log_file {
            config.logging.file = None;
        } else if config.logging.file.is_none() {
            config.logging.file = Some(config.output.path(".log"));
        }

        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(trials) = self.n_ber {
            config.trials = trials;
        }
        if let Some(system) = self.sys {
            config.system = system;
        }
        if let Some(bit) = self.bit {
            config.bit = bit;
        }

        if let Some(family) = self.nse {
            config.noise.family = family;
        }
        if let Some(values) = self.nse_var {
            config.noise.variance = Some(Grid::from_args(&values)?);
            config.noise.snr_per_bit = None;
        }
        if let Some(values) = self.snr_per_bit {
            config.noise.snr_per_bit = Some(Grid::from_args(&values)?);
            config.noise.variance = None;
        }
        if let Some(params) = self.nse_pars {
            config.noise.params = params;
        }

        if let Some(kind) = self.dec {
            config.decoder.kind = kind;
        }
        if let Some(realizations) = self.n_mcml {
            config
                .decoder
                .mcml
                .get_or_insert_with(McmlSettings::default)
                .realizations = realizations;
        }
        if self.mcml_brkt.is_some() || self.mcml_tol.is_some() {
            let mcml = config
                .decoder
                .mcml
                .as_mut()
                .ok_or("--mcml-brkt and --mcml-tol need --n-mcml or decoder.mcml in the script")?;
            if let Some(bracket) = self.mcml_brkt {
                mcml.bracket = match bracket[..] {
                    [lower, middle] => Some([lower, middle]),
                    _ => None,
                };
            }
            if let Some(tolerance) = self.mcml_tol {
                mcml.tolerance = tolerance;
            }
        }
        if let Some(kind) = self.ber_lb {
            config.ber_lower_bound = Some(kind);
        }

        if let Some(family) = self.spr {
            config.spreading.family = family;
        }
        if let Some(values) = self.spr_len {
            config.spreading.lengths = Grid::from_args(&values)?;
        }
        if let Some(params) = self.spr_pars {
            config.spreading.params = params;
        }
        if let Some(count) = self.spr_nseq {
            config.spreading.sequences = count;
        }

        Ok((config, self.threads))
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Resolve the seed, create the output directory and start logging.
fn prepare(config: &mut SimulationConfig) -> Result<u64, Box<dyn std::error::Error>> {
    let seed = *config.seed.get_or_insert_with(clock_seed);

    if let Some(parent) = config.output.root.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    init_logging(&config.logging)?;
    info!(seed, root = %config.output.root.display(), "Starting");
    Ok(seed)
}

fn run_ber(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, threads) = args.into_config()?;
    let seed = prepare(&mut config)?;
    let start = Instant::now();

    let sweep = BerSweep::new(config, seed)?;
    let result = run_sweep(&sweep, threads)?;

    let config = sweep.config();
    for path in output::save_sweep(&result, &config.output)? {
        info!(path = %path.display(), "Wrote");
    }
    config.save(&config.output.path(".yaml"))?;

    if result.undefined_points() > 0 {
        warn!(
            undefined = result.undefined_points(),
            "Some BER points are undefined (every decode failed)"
        );
    }
    info!(elapsed_s = start.elapsed().as_secs_f64(), "Done");
    Ok(())
}

#[cfg(feature = "parallel")]
fn run_sweep(
    sweep: &BerSweep,
    threads: Option<usize>,
) -> csk_core::CskResult<csk_core::SweepResult> {
    match threads {
        Some(threads) => csk_core::ParallelSweep::with_threads(sweep, threads).run(),
        None => csk_core::ParallelSweep::new(sweep).run(),
    }
}

#[cfg(not(feature = "parallel"))]
fn run_sweep(
    sweep: &BerSweep,
    threads: Option<usize>,
) -> csk_core::CskResult<csk_core::SweepResult> {
    if threads.is_some() {
        warn!("--threads ignored: built without the parallel feature");
    }
    sweep.run()
}

fn run_spreading(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, _) = args.into_config()?;
    let seed = prepare(&mut config)?;

    let samples = sample_spreading(&config, seed)?;
    for path in output::save_spreading(&samples, &config.output)? {
        info!(path = %path.display(), "Wrote");
    }
    config.save(&config.output.path(".yaml"))?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ber(args) => run_ber(args),
        Command::Spreading(args) => run_spreading(args),
        Command::Example => {
            print!("{}", SimulationConfig::example_yaml());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(std::iter::once("csk").chain(args.iter().copied())).unwrap();
        match cli.command {
            Command::Ber(args) | Command::Spreading(args) => args,
            Command::Example => panic!("expected a run command"),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "ber",
            "--sys",
            "noncoherent",
            "--bit",
            "-1",
            "--spr",
            "tent",
            "--spr-len",
            "10",
            "30",
            "10",
            "--snr-per-bit",
            "-2",
            "2",
            "--dec",
            "mcml",
            "--n-mcml",
            "50",
            "--seed",
            "7",
            "-o",
            "out/run",
        ]);
        let (config, threads) = args.into_config().unwrap();
        assert_eq!(threads, None);
        assert_eq!(config.system, SystemKind::NonCoherent);
        assert_eq!(config.bit, Bit::Minus);
        assert_eq!(config.spreading.family, SpreadingFamily::Tent);
        assert_eq!(config.lengths().unwrap(), vec![10, 20, 30]);
        let (_, snr) = config.noise_grid().unwrap();
        assert_eq!(snr, vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(config.decoder.mcml.as_ref().map(|m| m.realizations), Some(50));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.logging.file, Some(PathBuf::from("out/run.log")));
        config.validate().unwrap();
    }

    #[test]
    fn test_variance_replaces_snr() {
        let (config, _) = parse(&["ber", "--nse-var", "0.5", "--no-log-file"])
            .into_config()
            .unwrap();
        assert!(config.noise.snr_per_bit.is_none());
        assert_eq!(config.noise_grid().unwrap().1, vec![0.5]);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_mcml_bracket_override() {
        let (config, _) = parse(&[
            "ber", "--sys", "noncoherent", "--dec", "mcml", "--n-mcml", "40", "--mcml-brkt", "0.2", "2",
        ])
        .into_config()
        .unwrap();
        let mcml = config.decoder.mcml.unwrap();
        assert_eq!(mcml.bracket, Some([0.2, 2.0]));
        assert_eq!(mcml.realizations, 40);
        assert_eq!(mcml.tolerance, McmlSettings::default().tolerance);
    }

    #[test]
    fn test_mcml_needs_realizations() {
        assert!(Cli::try_parse_from(["csk", "ber", "--sys", "noncoherent", "--dec", "mcml"]).is_err());
        assert!(parse(&["ber", "--mcml-tol", "1e-6"]).into_config().is_err());

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("mcml.yaml");
        std::fs::write(&script, "system: noncoherent\ndecoder: {kind: mcml}\n").unwrap();
        let script_arg = script.to_string_lossy().into_owned();
        let (config, _) = parse(&["ber", "-s", &script_arg, "--no-log-file"]).into_config().unwrap();
        assert!(config.decoder.mcml.is_none());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_bit() {
        assert!(Cli::try_parse_from(["csk", "ber", "--bit", "0"]).is_err());
        assert!(Cli::try_parse_from(["csk", "ber", "--nse-var", "1", "--snr-per-bit", "3"]).is_err());
    }

    #[test]
    fn test_script_then_override() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("sweep.yaml");
        std::fs::write(&script, "trials: 500\nspreading: {family: circular, params: [0.3]}\n").unwrap();
        let script_arg = script.to_string_lossy().into_owned();

        let (config, _) = parse(&["spreading", "-s", &script_arg, "--n-ber", "900"])
            .into_config()
            .unwrap();
        assert_eq!(config.trials, 900);
        assert_eq!(config.spreading.family, SpreadingFamily::Circular);
        assert_eq!(config.spreading.params, vec![0.3]);
    }

    #[test]
    fn test_spreading_mode_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("spr");
        let root_arg = root.to_string_lossy().into_owned();
        let (config, _) = parse(&[
            "spreading",
            "--spr",
            "student",
            "--spr-len",
            "8",
            "--spr-nseq",
            "3",
            "--seed",
            "11",
            "-o",
            &root_arg,
        ])
        .into_config()
        .unwrap();

        let samples = sample_spreading(&config, 11).unwrap();
        let written = output::save_spreading(&samples, &config.output).unwrap();
        let text = std::fs::read_to_string(&written[0]).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Seq1\tSeq2\tSeq3"));
        assert_eq!(lines.count(), 8);
    }
}
