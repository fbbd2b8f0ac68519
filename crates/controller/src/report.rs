//! CSV data stream: one header line at startup, then one record per sampling
//! cycle.  This is the controller's only externally visible output, so the
//! format is fixed.

use anyhow::{Context, Result};
use std::io::Write;

use crate::state::SensorSample;

pub const CSV_HEADER: &str = "timestamp,fosforo,potassio,ph,umidade,irrigacao";

pub trait Reporter {
    fn header(&mut self) -> Result<()>;
    fn emit(&mut self, sample: &SensorSample, irrigation_active: bool) -> Result<()>;
}

fn flag(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

/// Format one record line (no trailing newline).
pub fn format_record(sample: &SensorSample, irrigation_active: bool) -> String {
    format!(
        "{},{},{},{:.2},{:.2},{}",
        sample.timestamp,
        flag(sample.phosphorus_present),
        flag(sample.potassium_present),
        sample.ph,
        sample.soil_moisture_percent,
        flag(irrigation_active)
    )
}

// ---------------------------------------------------------------------------
// Writer-backed reporter
// ---------------------------------------------------------------------------

/// Writes the CSV stream to any `Write`, flushing after every line so a
/// serial monitor or pipe sees records as they happen.
pub struct CsvReporter<W: Write> {
    out: W,
}

impl<W: Write> CsvReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}").context("failed to write report line")?;
        self.out.flush().context("failed to flush report output")
    }
}

impl<W: Write> Reporter for CsvReporter<W> {
    fn header(&mut self) -> Result<()> {
        self.line(CSV_HEADER)
    }

    fn emit(&mut self, sample: &SensorSample, irrigation_active: bool) -> Result<()> {
        let record = format_record(sample, irrigation_active);
        self.line(&record)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
