//! Plain-text result tables
//!
//! Files are named after the output root:
//!
//! | File | Contents |
//! |---|---|
//! | `<root>.ber.txt` | header, then the noise axis value and one BER per length (`NA` if undefined) |
//! | `<root>.dec.error.txt` | decode-failure counts |
//! | `<root>.berLb.txt` | BER lower bounds, when requested |
//! | `<root>.len<L>.spr.txt` | `Seq1 … SeqN` header, one chip per row |

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use csk_core::config::OutputConfig;
use csk_core::sweep::{SpreadingSample, SweepResult};

/// Sentinel for BER points where every decode failed.
pub const MISSING: &str = "NA";

fn create(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn write_row<W: Write, T: std::fmt::Display>(
    out: &mut W,
    cells: impl IntoIterator<Item = T>,
    delimiter: &str,
) -> io::Result<()> {
    let mut first = true;
    for cell in cells {
        if !first {
            out.write_all(delimiter.as_bytes())?;
        }
        write!(out, "{cell}")?;
        first = false;
    }
    writeln!(out)
}

/// BER table with header and axis column.
pub fn write_ber<W: Write>(out: &mut W, result: &SweepResult, delimiter: &str) -> io::Result<()> {
    let header = std::iter::once(result.axis.label().to_string())
        .chain(result.lengths.iter().map(|l| format!("SpreadingLen{l}")));
    write_row(out, header, delimiter)?;
    for (value, row) in result.noise_values.iter().zip(&result.ber) {
        let cells = std::iter::once(value.to_string()).chain(
            row.iter()
                .map(|ber| ber.map_or_else(|| MISSING.to_string(), |b| b.to_string())),
        );
        write_row(out, cells, delimiter)?;
    }
    Ok(())
}

/// Headerless numeric matrix.
pub fn write_matrix<W: Write, T: std::fmt::Display>(
    out: &mut W,
    rows: &[Vec<T>],
    delimiter: &str,
) -> io::Result<()> {
    for row in rows {
        write_row(out, row, delimiter)?;
    }
    Ok(())
}

/// Spreading sequences as columns.
pub fn write_spreading<W: Write>(
    out: &mut W,
    sample: &SpreadingSample,
    delimiter: &str,
) -> io::Result<()> {
    write_row(out, (1..=sample.sequences.len()).map(|k| format!("Seq{k}")), delimiter)?;
    for chip in 0..sample.length {
        write_row(out, sample.sequences.iter().map(|seq| seq[chip]), delimiter)?;
    }
    Ok(())
}

/// Write every table of a sweep; returns the paths written.
pub fn save_sweep(result: &SweepResult, output: &OutputConfig) -> io::Result<Vec<PathBuf>> {
    let delimiter = output.delimiter.as_str();
    let mut written = Vec::new();

    let path = output.path(".ber.txt");
    let mut out = create(&path)?;
    write_ber(&mut out, result, delimiter)?;
    out.flush()?;
    written.push(path);

    let path = output.path(".dec.error.txt");
    let mut out = create(&path)?;
    write_matrix(&mut out, &result.decode_failures, delimiter)?;
    out.flush()?;
    written.push(path);

    if let Some(ref bounds) = result.lower_bound {
        let path = output.path(".berLb.txt");
        let mut out = create(&path)?;
        write_matrix(&mut out, bounds, delimiter)?;
        out.flush()?;
        written.push(path);
    }

    Ok(written)
}

/// Write one spreading file per length; returns the paths written.
pub fn save_spreading(samples: &[SpreadingSample], output: &OutputConfig) -> io::Result<Vec<PathBuf>> {
    samples
        .iter()
        .map(|sample| {
            let path = output.path(&format!(".len{}.spr.txt", sample.length));
            let mut out = create(&path)?;
            write_spreading(&mut out, sample, &output.delimiter)?;
            out.flush()?;
            Ok(path)
        })
        .collect()
}
