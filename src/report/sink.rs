//! Result sinks.
//!
//! A sink receives the analyzed batches of one run. The file sink writes
//! a rendered report; the history sink appends one snapshot per batch to
//! a JSON-lines file.

use crate::models::{AnalysisRecord, Report};
use crate::report::generator::{
    generate_envelope_report, generate_json_report, generate_markdown_report, RenderOptions,
};
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output format for rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// Bare JSON analysis result
    Json,
    /// JSON wrapped in a success/data/message envelope
    Envelope,
}

/// Destination for the reports of one run.
pub trait ResultSink {
    fn publish(&mut self, reports: &[Report]) -> Result<()>;
}

/// Writes a rendered report to a file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
    options: RenderOptions,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat, options: RenderOptions) -> Self {
        Self {
            path: path.into(),
            format,
            options,
        }
    }

    /// Render the reports in this sink's format.
    pub fn render(&self, reports: &[Report]) -> Result<String> {
        match self.format {
            OutputFormat::Markdown => Ok(generate_markdown_report(reports, &self.options)),
            OutputFormat::Json => generate_json_report(reports),
            OutputFormat::Envelope => generate_envelope_report(reports),
        }
    }
}

impl ResultSink for FileSink {
    fn publish(&mut self, reports: &[Report]) -> Result<()> {
        let content = self.render(reports)?;

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write report to {}", self.path.display()))?;

        info!("Report written to {}", self.path.display());
        Ok(())
    }
}

/// Appends analysis snapshots to a JSON-lines history file.
#[derive(Debug, Clone)]
pub struct HistorySink {
    path: PathBuf,
}

impl HistorySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for HistorySink {
    fn publish(&mut self, reports: &[Report]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file {}", self.path.display()))?;

        for report in reports {
            let record = AnalysisRecord::from_report(report)?;
            let line = serde_json::to_string(&record)?;
            writeln!(file, "{}", line)
                .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        }

        debug!("Appended {} snapshots to {}", reports.len(), self.path.display());
        Ok(())
    }
}

/// Read up to `limit` snapshots from a history file, newest first.
///
/// A missing file is an empty history.
pub fn read_history(path: &Path, limit: usize) -> Result<Vec<AnalysisRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;

    let mut records = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<AnalysisRecord>(line)
                .with_context(|| format!("{}:{}: invalid snapshot", path.display(), n + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(limit);

    Ok(records)
}
