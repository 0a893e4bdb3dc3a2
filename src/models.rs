//! Data models for survey aggregation.
//!
//! This module contains the core data structures shared by the data source,
//! the aggregator and the report renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Label of the synthetic long-tail bucket.
pub const OTHER_LABEL: &str = "Other";

/// One row of survey data, keyed by header text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// Builds a record from `(header, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of a field, if the row has one.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Trimmed value of a field, or `None` when absent or blank.
    pub fn answer(&self, field: &str) -> Option<&str> {
        self.get(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// A parsed survey export: header row plus records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Header cells in column order.
    pub headers: Vec<String>,
    /// One record per data row.
    pub records: Vec<Record>,
}

/// How a chart locates its column in the header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSpec {
    /// Header equal to this text (raw, then normalized).
    Exact(String),
    /// Normalized header containing every fragment.
    Contains(Vec<String>),
    /// Numbered survey question, e.g. `6.9` + question text.
    Numbered { number: String, question: String },
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Exact(name) => write!(f, "\"{}\"", name),
            FieldSpec::Contains(fragments) => {
                write!(f, "containing \"{}\"", fragments.join("\" + \""))
            }
            FieldSpec::Numbered { number, question } => write!(f, "{} {}", number, question),
        }
    }
}

/// Separator inside a multi-valued survey answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Semicolon,
    Comma,
    /// `\n`, `\r\n` or a lone `\r`.
    Newline,
}

impl Delimiter {
    /// Whether `c` acts as this separator.
    pub fn matches(&self, c: char) -> bool {
        match self {
            Delimiter::Semicolon => c == ';',
            Delimiter::Comma => c == ',',
            Delimiter::Newline => c == '\n' || c == '\r',
        }
    }
}

/// Delimiters used by most multi-select survey questions.
pub fn default_delimiters() -> Vec<Delimiter> {
    vec![Delimiter::Semicolon, Delimiter::Newline]
}

/// Ordering applied to labels with equal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Keep the order in which labels were first seen.
    #[default]
    Stable,
    /// Label ascending.
    Alphabetical,
}

/// Kind of chart the renderer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
    Histogram,
    Map,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "Bar"),
            ChartKind::Pie => write!(f, "Pie"),
            ChartKind::Histogram => write!(f, "Histogram"),
            ChartKind::Map => write!(f, "Map"),
        }
    }
}

/// A category label with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

impl CategoryCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }

    /// Whether this is the long-tail bucket.
    pub fn is_other(&self) -> bool {
        self.label == OTHER_LABEL
    }
}

/// Ranked, bucketed category counts handed to the renderer.
pub type AggregationResult = Vec<CategoryCount>;

/// Label counts that remember first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` occurrences of `label`.
    pub fn add(&mut self, label: &str, n: usize) {
        match self.counts.get_mut(label) {
            Some(count) => *count += n,
            None => {
                self.order.push(label.to_string());
                self.counts.insert(label.to_string(), n);
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<usize> {
        self.counts.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// `(label, count)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.order
            .iter()
            .map(move |label| (label.as_str(), self.counts[label]))
    }
}

impl<S: AsRef<str>> FromIterator<(S, usize)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (label, n) in iter {
            counts.add(label.as_ref(), n);
        }
        counts
    }
}

/// Aggregated data for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// Header text of the resolved column.
    pub field: String,
    /// Ranked entries.
    pub entries: AggregationResult,
    /// Records with a non-blank answer.
    pub answered: usize,
}

impl ChartData {
    /// Share of respondents, in percent.
    pub fn percent(&self, count: usize) -> f64 {
        if self.answered == 0 {
            return 0.0;
        }
        count as f64 / self.answered as f64 * 100.0
    }

    /// Detail value, one decimal (e.g. `42.9%`).
    pub fn detail_percent(&self, count: usize) -> String {
        format!("{:.1}%", self.percent(count))
    }

    /// Inline label value, no decimals (e.g. `43%`).
    pub fn inline_percent(&self, count: usize) -> String {
        format!("{:.0}%", self.percent(count))
    }

    /// Sum of entry counts; may exceed `answered` for multi-select fields.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Entry highlighted for `container` in the given selection.
    pub fn selected_entry(
        &self,
        container: &str,
        selection: &SelectionState,
    ) -> Option<&CategoryCount> {
        let label = selection.selected(container)?;
        self.entries.iter().find(|e| e.label == label)
    }
}

/// Renderer-owned selection: container -> selected label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: HashMap<String, String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, container: impl Into<String>, label: impl Into<String>) {
        self.selected.insert(container.into(), label.into());
    }

    #[cfg(test)]
    pub fn clear(&mut self, container: &str) {
        self.selected.remove(container);
    }

    pub fn selected(&self, container: &str) -> Option<&str> {
        self.selected.get(container).map(String::as_str)
    }
}

/// What a chart slot ends up showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartBody {
    /// Aggregated data ready to draw.
    Data(ChartData),
    /// Inline message shown instead of a chart.
    Message { message: String },
}

/// Result of building one configured chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOutcome {
    pub container: String,
    pub title: String,
    pub kind: ChartKind,
    pub body: ChartBody,
}

impl ChartOutcome {
    /// Whether the chart ended in a message rather than data.
    pub fn is_error(&self) -> bool {
        matches!(self.body, ChartBody::Message { .. })
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Default survey export location.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of charts built.
    pub charts_total: usize,
    /// Number of charts that ended in a message.
    pub charts_failed: usize,
    /// Wall time in seconds.
    pub duration_seconds: f64,
}

/// The complete set of chart outcomes for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub metadata: ReportMetadata,
    pub charts: Vec<ChartOutcome>,
}
