//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.almera-tally.toml` files. The file describes the survey source and the
//! charts on the page.

use crate::models::{default_delimiters, ChartKind, Delimiter, FieldSpec, TieBreak};
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".almera-tally.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Survey export settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Page layout.
    #[serde(default)]
    pub page: PageConfig,

    /// Charts on the page, in display order.
    #[serde(default = "default_charts")]
    pub charts: Vec<ChartConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            source: SourceConfig::default(),
            report: ReportConfig::default(),
            page: PageConfig::default(),
            charts: default_charts(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "almera_report.md".to_string()
}

/// Where the survey export lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// File path or `http(s)` URL of the CSV export.
    #[serde(default = "default_location")]
    pub location: String,

    /// Request timeout in seconds for remote exports.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_location() -> String {
    "data/almera_survey.csv".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report heading.
    #[serde(default = "default_title")]
    pub title: String,

    /// Top-N for charts that don't set their own.
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    /// Draw proportional text bars next to each row.
    #[serde(default = "default_true")]
    pub show_bars: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            default_top_n: default_top_n(),
            show_bars: true,
        }
    }
}

fn default_title() -> String {
    "ALMERA Survey Charts".to_string()
}

fn default_top_n() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Page layout: the chart containers that exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageConfig {
    /// Declared containers. Empty accepts any container.
    #[serde(default)]
    pub containers: Vec<String>,
}

impl PageConfig {
    /// Whether the page has a slot for `container`.
    pub fn has_container(&self, container: &str) -> bool {
        self.containers.is_empty() || self.containers.iter().any(|c| c == container)
    }
}

/// One chart on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Container the chart is drawn into.
    pub container: String,

    /// Chart heading.
    pub title: String,

    /// Chart kind.
    #[serde(default)]
    pub kind: ChartKind,

    /// Column to aggregate.
    pub field: FieldSpec,

    /// Separators inside multi-valued answers.
    #[serde(default = "default_delimiters")]
    pub delimiters: Vec<Delimiter>,

    /// Labels shown before folding into "Other".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,

    /// Ordering of equal counts.
    #[serde(default)]
    pub tie_break: TieBreak,

    /// Per-chart export location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Histogram bin width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_width: Option<f64>,
}

impl ChartConfig {
    /// Top-N for this chart, falling back to the report default.
    pub fn effective_top_n(&self, default: usize) -> usize {
        self.top_n.unwrap_or(default)
    }

    /// Export location for this chart.
    pub fn location<'a>(&'a self, default: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(default)
    }

    /// Histogram bin width (10 when unset).
    pub fn effective_bin_width(&self) -> f64 {
        self.bin_width.unwrap_or(10.0)
    }
}

/// Charts of the ALMERA survey page.
fn default_charts() -> Vec<ChartConfig> {
    let chart = |container: &str, title: &str, kind: ChartKind, field: FieldSpec| ChartConfig {
        container: container.to_string(),
        title: title.to_string(),
        kind,
        field,
        delimiters: default_delimiters(),
        top_n: None,
        tie_break: TieBreak::Stable,
        source: None,
        bin_width: None,
    };

    vec![
        chart(
            "labs-map",
            "Laboratories by country",
            ChartKind::Map,
            FieldSpec::Exact("Country".to_string()),
        ),
        ChartConfig {
            top_n: Some(8),
            ..chart(
                "decay-data-chart",
                "Decay data library",
                ChartKind::Bar,
                FieldSpec::Numbered {
                    number: "6.9".to_string(),
                    question: "What decay data library is used?".to_string(),
                },
            )
        },
        ChartConfig {
            delimiters: vec![Delimiter::Comma],
            tie_break: TieBreak::Alphabetical,
            ..chart(
                "affiliation-chart",
                "Laboratory affiliation",
                ChartKind::Pie,
                FieldSpec::Exact("Affiliation".to_string()),
            )
        },
        chart(
            "techniques-chart",
            "Measurement techniques",
            ChartKind::Bar,
            FieldSpec::Contains(vec!["measurement techniques".to_string()]),
        ),
        ChartConfig {
            bin_width: Some(5.0),
            ..chart(
                "staff-histogram",
                "Number of staff",
                ChartKind::Histogram,
                FieldSpec::Exact("Number of staff".to_string()),
            )
        },
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load `CONFIG_FILE` from `dir`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let default_path = dir.join(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref source) = args.source {
            self.source.location = source.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(top_n) = args.top_n {
            self.report.default_top_n = top_n;
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the settings the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.report.default_top_n >= 1,
            "report.default_top_n must be at least 1"
        );
        ensure!(
            self.source.timeout_seconds >= 1,
            "source.timeout_seconds must be at least 1"
        );

        let mut seen = HashSet::new();
        for chart in &self.charts {
            if !seen.insert(chart.container.as_str()) {
                bail!("Duplicate chart container: {}", chart.container);
            }
            if chart.top_n == Some(0) {
                bail!("Chart {}: top_n must be at least 1", chart.container);
            }
            let width = chart.effective_bin_width();
            if chart.kind == ChartKind::Histogram && !(width.is_finite() && width > 0.0) {
                bail!("Chart {}: bin_width must be positive", chart.container);
            }
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
