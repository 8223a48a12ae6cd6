//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::Profile;
use crate::report::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// CityInsights - rule-based zone risk analyzer
///
/// Classifies per-zone waste, traffic, streetlight and air quality
/// readings into warning/critical issues and city-wide aggregates.
/// Markdown/JSON reports.
///
/// Examples:
///   cityinsights --sample
///   cityinsights --input zones.json --format json --output analysis.json
///   cityinsights --input north.json --input south.json --history history.jsonl
///   cityinsights --input zones.json --fail-on critical
///   cityinsights --show-history 5 --history history.jsonl
///   cityinsights --zone-stats Zone-B --history history.jsonl
///   cityinsights --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON file with zone readings (repeatable)
    ///
    /// Either a bare array of readings or an object with a "zones" array.
    /// Each file is analyzed as an independent batch.
    #[arg(
        short,
        long,
        value_name = "FILE",
        required_unless_present_any = ["sample", "init_config", "show_history", "zone_stats"]
    )]
    pub input: Vec<PathBuf>,

    /// Analyze the built-in ten-zone sample batch
    #[arg(long)]
    pub sample: bool,

    /// Analyzer profile
    ///
    /// Overrides the config file setting.
    #[arg(long, value_name = "PROFILE", env = "CITYINSIGHTS_PROFILE")]
    pub profile: Option<Profile>,

    /// Output file path for the report
    ///
    /// Default: from config or city_insights.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, envelope)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Append one snapshot per batch to this JSON-lines history file
    #[arg(long, value_name = "FILE", env = "CITYINSIGHTS_HISTORY")]
    pub history: Option<PathBuf>,

    /// Print the newest snapshots from the history file and exit
    #[arg(long, value_name = "COUNT", conflicts_with = "zone_stats")]
    pub show_history: Option<usize>,

    /// Print the latest risk and run count of one zone from the history file and exit
    #[arg(long, value_name = "ZONE")]
    pub zone_stats: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cityinsights.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of batches analyzed concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Report this fixed confidence instead of a random draw (0 - 100)
    #[arg(long, value_name = "PERCENT")]
    pub confidence: Option<u8>,

    /// Fail if any zone is at or above this risk level
    ///
    /// Useful for alerting pipelines. Exit code 2 when threshold is met.
    /// Values: warning, critical
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<RiskThreshold>,

    /// Minimum zone risk shown in the Markdown zone sections
    ///
    /// Aggregates and JSON output always cover every zone.
    #[arg(long, value_name = "LEVEL")]
    pub min_risk: Option<RiskThreshold>,

    /// Generate a default .cityinsights.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Risk level for --fail-on and --min-risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum RiskThreshold {
    Warning,
    Critical,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                return Err("Concurrency must be at least 1".to_string());
            }
        }

        if let Some(confidence) = self.confidence {
            if confidence > 100 {
                return Err("Confidence must be between 0 and 100".to_string());
            }
        }

        if self.show_history == Some(0) {
            return Err("--show-history needs a count of at least 1".to_string());
        }

        if let Some(ref zone) = self.zone_stats {
            if zone.trim().is_empty() {
                return Err("--zone-stats needs a zone name".to_string());
            }
        }

        // Validate input files
        for input in &self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
