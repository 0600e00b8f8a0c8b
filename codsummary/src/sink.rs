//! CSV output for the reports.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

/// One row of a report. Missing values are written as empty cells.
pub trait ReportRow {
    fn cells(&self) -> Vec<Option<String>>;
}

impl ReportRow for Vec<Option<String>> {
    fn cells(&self) -> Vec<Option<String>> {
        self.clone()
    }
}

/// Writes a header row up front, then appends rows one at a time, flushing after each.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl ReportWriter<File> {
    pub fn create<S: AsRef<str>>(path: &Path, header: &[S]) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        Self::from_writer(file, header)
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn from_writer<S: AsRef<str>>(inner: W, header: &[S]) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(header.iter().map(|h| h.as_ref()))?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn append<R: ReportRow + ?Sized>(&mut self, row: &R) -> Result<()> {
        let cells = row.cells();
        self.writer
            .write_record(cells.iter().map(|cell| cell.as_deref().unwrap_or_default()))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush report: {}", e.error()))
    }
}

/// Writes a complete table in one go.
pub fn write_table<S, R>(path: &Path, header: &[S], rows: &[R]) -> Result<()>
where
    S: AsRef<str>,
    R: ReportRow,
{
    let mut writer = ReportWriter::create(path, header)?;
    for row in rows {
        writer.append(row)?;
    }
    debug!("Wrote {} rows to {}", writer.rows(), path.display());
    Ok(())
}
