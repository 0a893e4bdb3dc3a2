//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::SelectionState;
use clap::Parser;
use std::path::PathBuf;

/// almera-tally - ranked category tables from ALMERA survey exports
///
/// Reads a survey CSV export, aggregates the configured columns into
/// ranked category counts and writes a Markdown or JSON report.
///
/// Examples:
///   almera-tally --source data/almera_2024.csv
///   almera-tally --source https://example.org/almera.csv --format json -o charts.json
///   almera-tally --chart decay-data-chart --top-n 6
///   almera-tally --source data/almera_2024.csv --list-columns
///   almera-tally --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Survey export location (file path or http(s) URL)
    ///
    /// Overrides source.location from the config file.
    #[arg(short, long, value_name = "LOCATION", env = "ALMERA_SOURCE")]
    pub source: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .almera-tally.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Labels shown per chart before folding into "Other"
    ///
    /// Applies to charts that don't set their own top_n.
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// Request timeout in seconds for remote exports
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only build these charts (by container, repeatable)
    #[arg(long = "chart", value_name = "CONTAINER")]
    pub charts: Vec<String>,

    /// Highlight a label in a chart: CONTAINER=LABEL (repeatable)
    #[arg(long = "select", value_name = "CONTAINER=LABEL")]
    pub selections: Vec<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 if any chart could not be rendered
    #[arg(long)]
    pub strict: bool,

    /// Print the normalized column headers of the source and exit
    #[arg(long)]
    pub list_columns: bool,

    /// Generate a default .almera-tally.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Default report file name for this format.
    pub fn default_output(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "almera_report.md",
            OutputFormat::Json => "almera_report.json",
        }
    }
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

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top_n == Some(0) {
            return Err("Top-N must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref source) = self.source {
            if source.trim().is_empty() {
                return Err("Source location must not be empty".to_string());
            }
        }

        self.selection()?;

        Ok(())
    }

    /// Build the renderer selection from `--select` values.
    pub fn selection(&self) -> Result<SelectionState, String> {
        let mut selection = SelectionState::new();

        for raw in &self.selections {
            let (container, label) = raw
                .split_once('=')
                .map(|(c, l)| (c.trim(), l.trim()))
                .filter(|(c, l)| !c.is_empty() && !l.is_empty())
                .ok_or_else(|| format!("Invalid --select value (expected CONTAINER=LABEL): {}", raw))?;
            selection.select(container, label);
        }

        Ok(selection)
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
