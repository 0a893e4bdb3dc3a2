//! Report generation.
//!
//! This module renders chart outcomes as a Markdown page or as JSON for a
//! front-end chart renderer.

use crate::models::{
    ChartBody, ChartData, ChartKind, ChartOutcome, Report, ReportMetadata, SelectionState,
};
use anyhow::Result;
use serde::Serialize;

/// Width of the text bar for the largest entry.
const BAR_WIDTH: usize = 30;

/// Renderer-side options.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Draw proportional text bars.
    pub show_bars: bool,
    /// Highlighted label per container.
    pub selection: SelectionState,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.title));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));

    for chart in &report.charts {
        output.push_str(&generate_chart_section(chart, options));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Charts:** {}\n", metadata.charts_total));
    if metadata.charts_failed > 0 {
        section.push_str(&format!(
            "- **Charts Not Rendered:** {}\n",
            metadata.charts_failed
        ));
    }
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    if report.charts.is_empty() {
        return String::new();
    }

    let mut toc = String::new();
    toc.push_str("## Charts\n\n");
    for chart in &report.charts {
        toc.push_str(&format!("- [{}](#{})\n", chart.title, anchor(&chart.container)));
    }
    toc.push('\n');

    toc
}

/// Generate the section for one chart.
fn generate_chart_section(chart: &ChartOutcome, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## {} {{#{}}}\n\n",
        chart.title,
        anchor(&chart.container)
    ));

    match &chart.body {
        ChartBody::Data(data) => {
            section.push_str(&format!(
                "*{} chart | Column: {} | Answered: {} | Mentions: {}*\n\n",
                chart.kind,
                escape_cell(&data.field),
                data.answered,
                data.total()
            ));
            section.push_str(&generate_data_table(chart, data, options));
        }
        ChartBody::Message { message } => {
            section.push_str(&format!("> ⚠️ {}\n\n", message));
        }
    }

    section
}

/// Generate the label/count table for a chart.
fn generate_data_table(chart: &ChartOutcome, data: &ChartData, options: &RenderOptions) -> String {
    let mut table = String::new();

    let label_heading = match chart.kind {
        ChartKind::Histogram => "Range",
        ChartKind::Map => "Country",
        ChartKind::Bar | ChartKind::Pie => "Category",
    };

    if options.show_bars {
        table.push_str(&format!("| {} | Count | Share | |\n", label_heading));
        table.push_str("|:---|:---:|:---:|:---|\n");
    } else {
        table.push_str(&format!("| {} | Count | Share |\n", label_heading));
        table.push_str("|:---|:---:|:---:|\n");
    }

    let selected = data
        .selected_entry(&chart.container, &options.selection)
        .map(|entry| entry.label.as_str());
    let max = data.entries.iter().map(|e| e.count).max().unwrap_or(0);

    for entry in &data.entries {
        let label = if selected == Some(entry.label.as_str()) {
            format!(
                "**{}** ◀ {}",
                escape_cell(&entry.label),
                data.detail_percent(entry.count)
            )
        } else {
            escape_cell(&entry.label)
        };

        table.push_str(&format!(
            "| {} | {} | {} |",
            label,
            entry.count,
            data.inline_percent(entry.count)
        ));
        if options.show_bars {
            table.push_str(&format!(" {} |", bar(entry.count, max)));
        }
        table.push('\n');
    }
    table.push('\n');

    table
}

/// Proportional text bar.
fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count as f64 / max as f64 * BAR_WIDTH as f64).round() as usize;
    "█".repeat(width)
}

/// Keep free-text answers from breaking the table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn anchor(container: &str) -> String {
    container.replace(['/', '.', ' '], "-").to_lowercase()
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Generated by almera-tally v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: &'a str,
    metadata: &'a ReportMetadata,
    charts: Vec<JsonChart<'a>>,
}

#[derive(Serialize)]
struct JsonChart<'a> {
    container: &'a str,
    title: &'a str,
    kind: ChartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<&'a str>,
    entries: Vec<JsonEntry<'a>>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    label: &'a str,
    count: usize,
    /// Share of respondents, one decimal.
    percent: f64,
}

/// Generate a JSON report for a chart renderer.
pub fn generate_json_report(report: &Report, options: &RenderOptions) -> Result<String> {
    let charts = report
        .charts
        .iter()
        .map(|chart| match &chart.body {
            ChartBody::Data(data) => JsonChart {
                container: &chart.container,
                title: &chart.title,
                kind: chart.kind,
                message: None,
                field: Some(data.field.as_str()),
                answered: Some(data.answered),
                selected: data
                    .selected_entry(&chart.container, &options.selection)
                    .map(|entry| entry.label.as_str()),
                entries: data
                    .entries
                    .iter()
                    .map(|entry| JsonEntry {
                        label: &entry.label,
                        count: entry.count,
                        percent: (data.percent(entry.count) * 10.0).round() / 10.0,
                    })
                    .collect(),
            },
            ChartBody::Message { message } => JsonChart {
                container: &chart.container,
                title: &chart.title,
                kind: chart.kind,
                message: Some(message.as_str()),
                field: None,
                answered: None,
                selected: None,
                entries: Vec::new(),
            },
        })
        .collect();

    let json = JsonReport {
        title: &report.title,
        metadata: &report.metadata,
        charts,
    };

    serde_json::to_string_pretty(&json).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryCount;
    use chrono::Utc;

    fn create_test_report() -> Report {
        let metadata = ReportMetadata {
            source: "data/almera_survey.csv".to_string(),
            generated_at: Utc::now(),
            charts_total: 2,
            charts_failed: 1,
            duration_seconds: 0.4,
        };

        Report {
            title: "ALMERA Survey Charts".to_string(),
            metadata,
            charts: vec![
                ChartOutcome {
                    container: "decay-data-chart".to_string(),
                    title: "Decay data library".to_string(),
                    kind: ChartKind::Bar,
                    body: ChartBody::Data(ChartData {
                        field: "6.9 What decay data library is used?".to_string(),
                        entries: vec![
                            CategoryCount::new("DDEP", 4),
                            CategoryCount::new("NUDAT", 2),
                            CategoryCount::new("Other", 1),
                        ],
                        answered: 6,
                    }),
                },
                ChartOutcome {
                    container: "budget-chart".to_string(),
                    title: "Budget".to_string(),
                    kind: ChartKind::Pie,
                    body: ChartBody::Message {
                        message: "Column not found in the survey data: \"Budget\"".to_string(),
                    },
                },
            ],
        }
    }

    fn options() -> RenderOptions {
        RenderOptions {
            show_bars: true,
            selection: SelectionState::new(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &options());

        assert!(markdown.contains("# ALMERA Survey Charts"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("Charts Not Rendered:** 1"));
        assert!(markdown.contains("[Decay data library](#decay-data-chart)"));
        assert!(markdown.contains("| DDEP | 4 | 67% |"));
        assert!(markdown.contains("Answered: 6 | Mentions: 7"));
        assert!(markdown.contains("> ⚠️ Column not found in the survey data: \"Budget\""));
    }

    #[test]
    fn test_bars_scale_to_largest_entry() {
        assert_eq!(bar(4, 4).chars().count(), BAR_WIDTH);
        assert_eq!(bar(2, 4).chars().count(), BAR_WIDTH / 2);
        assert_eq!(bar(0, 0), "");
    }

    #[test]
    fn test_without_bars() {
        let report = create_test_report();
        let opts = RenderOptions {
            show_bars: false,
            ..options()
        };
        let markdown = generate_markdown_report(&report, &opts);
        assert!(markdown.contains("| DDEP | 4 | 67% |\n"));
        assert!(!markdown.contains('█'));
    }

    #[test]
    fn test_selected_row_is_highlighted() {
        let report = create_test_report();
        let mut opts = options();
        opts.selection.select("decay-data-chart", "NUDAT");

        let markdown = generate_markdown_report(&report, &opts);
        assert!(markdown.contains("| **NUDAT** ◀ 33.3% | 2 | 33% |"));
    }

    #[test]
    fn test_pipe_in_label_is_escaped() {
        let mut report = create_test_report();
        if let ChartBody::Data(data) = &mut report.charts[0].body {
            data.entries[1].label = "NUDAT | ENSDF".to_string();
        }

        let markdown = generate_markdown_report(&report, &options());
        assert!(markdown.contains("| NUDAT \\| ENSDF | 2 | 33% |"));
        assert_eq!(escape_cell("a\nb"), "a b");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report, &options()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let charts = value["charts"].as_array().unwrap();
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0]["entries"][0]["label"], "DDEP");
        assert_eq!(charts[0]["entries"][0]["percent"], 66.7);
        assert_eq!(charts[0]["answered"], 6);
        assert_eq!(charts[0]["kind"], "bar");
        assert!(charts[1]["message"].as_str().unwrap().contains("Budget"));
        assert!(charts[1].get("answered").is_none());
    }
}
