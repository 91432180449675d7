//! Text export of spectrograms
//!
//! Layout: a header line with the comma-separated time bins, written behind a
//! `# ` comment marker, then one line per frequency holding the frequency
//! followed by the power at every time bin.

use super::estimator::Spectrogram;
use crate::error::{Result, SpectralError};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Frequency/time/power table as exchanged through CSV files
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramTable {
    pub times: Vec<f64>,
    pub freqs: Vec<f64>,
    /// Shape (freqs.len(), times.len())
    pub power: Array2<f64>,
}

impl SpectrogramTable {
    pub fn new(freqs: Vec<f64>, times: Vec<f64>, power: Array2<f64>) -> Result<Self> {
        if power.dim() != (freqs.len(), times.len()) {
            return Err(SpectralError::InvalidInput(format!(
                "power shape {:?} does not match {} frequencies × {} time bins",
                power.dim(),
                freqs.len(),
                times.len()
            )));
        }
        Ok(Self { times, freqs, power })
    }

    /// Table of an arbitrary (already scaled) matrix on a spectrogram's axes
    pub fn with_power(spectrogram: &Spectrogram, power: Array2<f64>) -> Result<Self> {
        Self::new(spectrogram.freqs.clone(), spectrogram.times.clone(), power)
    }

    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "# {}", join(&self.times))?;
        for (freq, row) in self.freqs.iter().zip(self.power.rows()) {
            write!(writer, "{:.18e}", freq)?;
            for value in row {
                write!(writer, ",{:.18e}", value)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_csv(BufWriter::new(file))?;
        log::info!(
            "[Export] wrote {}×{} spectrogram to {}",
            self.freqs.len(),
            self.times.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn read_csv<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or_else(|| SpectralError::InvalidInput("spectrogram file is empty".to_string()))??;
        let times = parse_row(&header.replace('#', ""), 1)?;

        let mut freqs = Vec::new();
        let mut values = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let row = parse_row(&line, i + 2)?;
            if row.len() != times.len() + 1 {
                return Err(SpectralError::InvalidInput(format!(
                    "line {}: expected {} columns, found {}",
                    i + 2,
                    times.len() + 1,
                    row.len()
                )));
            }
            freqs.push(row[0]);
            values.extend_from_slice(&row[1..]);
        }

        let power = Array2::from_shape_vec((freqs.len(), times.len()), values)
            .map_err(|e| SpectralError::InvalidInput(e.to_string()))?;
        Self::new(freqs, times, power)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_csv(BufReader::new(file))
    }

    /// Element-wise `self - other` on an identical grid
    pub fn difference(&self, other: &SpectrogramTable) -> Result<Self> {
        if self.power.dim() != other.power.dim() || !same_axis(&self.freqs, &other.freqs) {
            return Err(SpectralError::InvalidInput(
                "spectrograms must share the same frequency/time grid".to_string(),
            ));
        }
        if !same_axis(&self.times, &other.times) {
            log::warn!("[Export] time bins differ between spectrograms; keeping the first axis");
        }

        Ok(Self {
            times: self.times.clone(),
            freqs: self.freqs.clone(),
            power: &self.power - &other.power,
        })
    }
}

impl From<&Spectrogram> for SpectrogramTable {
    fn from(spectrogram: &Spectrogram) -> Self {
        Self {
            times: spectrogram.times.clone(),
            freqs: spectrogram.freqs.clone(),
            power: spectrogram.power.clone(),
        }
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.18e}", v))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_row(line: &str, line_no: usize) -> Result<Vec<f64>> {
    line.split(',')
        .map(|field| {
            let field = field.trim();
            field.parse::<f64>().map_err(|_| {
                SpectralError::InvalidInput(format!("line {}: cannot parse '{}'", line_no, field))
            })
        })
        .collect()
}

fn same_axis(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= 1e-9 * x.abs().max(1.0))
}
