//! Chart-level error taxonomy.
//!
//! Every variant is recoverable: the chart pipeline turns it into an inline
//! message for the one chart that failed and carries on with the rest.

use thiserror::Error;

/// Failure while building a single chart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    /// The CSV export could not be fetched or read.
    #[error("data source unavailable: {location}: {reason}")]
    DataSourceUnavailable { location: String, reason: String },

    /// No header matched the field description.
    #[error("column not found: {field}")]
    ColumnNotFound { field: String },

    /// More than one header matched the field description.
    #[error("ambiguous column {field}: matches {}", .candidates.join(" | "))]
    AmbiguousColumn {
        field: String,
        candidates: Vec<String>,
    },

    /// The column exists but nobody answered it.
    #[error("no responses for column: {field}")]
    EmptyResult { field: String },

    /// The chart targets a container the page does not declare.
    #[error("container missing: {container}")]
    ContainerMissing { container: String },
}

impl ChartError {
    /// Text shown in place of the chart.
    pub fn user_message(&self) -> String {
        match self {
            ChartError::DataSourceUnavailable { .. } => {
                "Survey data could not be loaded.".to_string()
            }
            ChartError::ColumnNotFound { field } => {
                format!("Column not found in the survey data: {}", field)
            }
            ChartError::AmbiguousColumn { field, candidates } => format!(
                "Column {} matches {} headers; refine the field description.",
                field,
                candidates.len()
            ),
            ChartError::EmptyResult { .. } => "No data available for this chart.".to_string(),
            ChartError::ContainerMissing { container } => {
                format!("Chart container \"{}\" is not present on the page.", container)
            }
        }
    }
}
