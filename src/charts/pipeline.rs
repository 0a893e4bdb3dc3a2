//! Per-chart pipeline.
//!
//! Each chart runs on its own: check its container, fetch the export, resolve
//! the column, aggregate. Failures stay inside the chart and come back as an
//! inline message; the other charts are unaffected.

use crate::analysis::{
    bin_numeric, count_answered, count_categories, rank_all, rank_and_bucket, resolve_field,
};
use crate::config::{ChartConfig, Config, PageConfig};
use crate::error::ChartError;
use crate::models::{ChartBody, ChartData, ChartKind, ChartOutcome, Dataset};
use crate::source::load_dataset;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

/// Builds chart outcomes from the page configuration.
pub struct ChartBuilder {
    client: reqwest::Client,
    default_location: String,
    default_top_n: usize,
    page: PageConfig,
    progress: Option<ProgressBar>,
}

impl ChartBuilder {
    /// Create a builder; `show_progress` draws a bar as charts finish.
    pub fn new(config: &Config, client: reqwest::Client, show_progress: bool) -> Self {
        let progress = show_progress.then(|| {
            let pb = ProgressBar::new(0);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} charts")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb
        });

        Self {
            client,
            default_location: config.source.location.clone(),
            default_top_n: config.report.default_top_n,
            page: config.page.clone(),
            progress,
        }
    }

    /// Build every chart concurrently; output follows `charts` order.
    pub async fn build_page(&self, charts: &[ChartConfig]) -> Vec<ChartOutcome> {
        info!("Building {} charts", charts.len());
        if let Some(ref pb) = self.progress {
            pb.set_length(charts.len() as u64);
        }

        let outcomes = join_all(charts.iter().map(|chart| self.build_chart(chart))).await;

        if let Some(ref pb) = self.progress {
            pb.finish_with_message("Charts ready");
        }
        outcomes
    }

    /// Build one chart, converting any failure into its inline message.
    pub async fn build_chart(&self, chart: &ChartConfig) -> ChartOutcome {
        let body = match self.chart_data(chart).await {
            Ok(data) => ChartBody::Data(data),
            Err(e) => {
                warn!("Chart {} not rendered: {}", chart.container, e);
                ChartBody::Message {
                    message: e.user_message(),
                }
            }
        };

        if let Some(ref pb) = self.progress {
            pb.inc(1);
        }

        ChartOutcome {
            container: chart.container.clone(),
            title: chart.title.clone(),
            kind: chart.kind,
            body,
        }
    }

    async fn chart_data(&self, chart: &ChartConfig) -> Result<ChartData, ChartError> {
        if !self.page.has_container(&chart.container) {
            return Err(ChartError::ContainerMissing {
                container: chart.container.clone(),
            });
        }

        let dataset = load_dataset(chart.location(&self.default_location), &self.client).await?;
        aggregate(chart, &dataset, self.default_top_n)
    }
}

/// Aggregate a chart's column from a loaded dataset.
pub fn aggregate(
    chart: &ChartConfig,
    dataset: &Dataset,
    default_top_n: usize,
) -> Result<ChartData, ChartError> {
    let field = resolve_field(&dataset.headers, &chart.field)?;
    let records = &dataset.records;

    let (entries, answered) = match chart.kind {
        ChartKind::Bar | ChartKind::Pie => {
            let counts = count_categories(records, &field, &chart.delimiters);
            let top_n = chart.effective_top_n(default_top_n);
            (
                rank_and_bucket(&counts, top_n, chart.tie_break),
                count_answered(records, &field),
            )
        }
        ChartKind::Map => {
            let counts = count_categories(records, &field, &chart.delimiters);
            (
                rank_all(&counts, chart.tie_break),
                count_answered(records, &field),
            )
        }
        ChartKind::Histogram => bin_numeric(records, &field, chart.effective_bin_width()),
    };

    if answered == 0 || entries.is_empty() {
        return Err(ChartError::EmptyResult { field });
    }

    debug!(
        "Chart {}: {} entries from {} responses",
        chart.container,
        entries.len(),
        answered
    );

    Ok(ChartData {
        field,
        entries,
        answered,
    })
}
