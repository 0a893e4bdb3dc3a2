//! almera-tally - ranked category tables from ALMERA survey exports
//!
//! A CLI tool that reads laboratory-network survey CSV exports, splits
//! multi-valued answers into categories, ranks them and folds the long tail
//! into "Other", then writes the chart data as Markdown or JSON.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, config, unwritable output, etc.)
//!   2 - --strict was set and at least one chart could not be rendered

mod analysis;
mod charts;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod source;

use anyhow::{bail, Context, Result};
use charts::ChartBuilder;
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{ChartConfig, Config, CONFIG_FILE};
use models::{Report, ReportMetadata};
use report::RenderOptions;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("almera-tally v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .almera-tally.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with the default chart set.", CONFIG_FILE);
    println!("   Edit it to point at your survey export and adjust the charts.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Build the configured charts and write the report. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args, Path::new("."))?;
    config.merge_with_args(&args);
    config.validate()?;

    let client = source::build_client(config.source.timeout_seconds)?;

    if args.list_columns {
        return handle_list_columns(&config, &client).await;
    }

    let charts = select_charts(&config.charts, &args.charts)?;
    if charts.is_empty() {
        warn!("No charts configured");
    }

    println!("📊 Building {} charts from {}", charts.len(), config.source.location);

    let builder = ChartBuilder::new(&config, client, !args.quiet);
    let outcomes = builder.build_page(&charts).await;

    let failed = outcomes.iter().filter(|o| o.is_error()).count();
    let report = Report {
        title: config.report.title.clone(),
        metadata: ReportMetadata {
            source: config.source.location.clone(),
            generated_at: Utc::now(),
            charts_total: outcomes.len(),
            charts_failed: failed,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        charts: outcomes,
    };

    let options = RenderOptions {
        show_bars: config.report.show_bars,
        // Already checked in Args::validate
        selection: args.selection().unwrap_or_default(),
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report, &options)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &options),
    };

    let output_path = output_path(&args, &config);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📝 Report Summary:");
    println!("   Charts rendered: {}", report.charts.len() - failed);
    if failed > 0 {
        println!("   Charts not rendered: {}", failed);
        for chart in report.charts.iter().filter(|c| c.is_error()) {
            println!("     ⚠️  {}", chart.container);
        }
    }
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!("\n✅ Report saved to: {}", output_path.display());

    if args.strict && failed > 0 {
        eprintln!(
            "\n⛔ {} chart(s) could not be rendered. Failing (exit code 2).",
            failed
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --list-columns: print normalized headers of the source and exit.
async fn handle_list_columns(config: &Config, client: &reqwest::Client) -> Result<i32> {
    let dataset = source::load_dataset(&config.source.location, client).await?;

    println!(
        "\n🔍 {} columns, {} records in {}\n",
        dataset.headers.len(),
        dataset.records.len(),
        config.source.location
    );
    for (i, header) in dataset.headers.iter().enumerate() {
        let answered = analysis::count_answered(&dataset.records, header);
        println!(
            "   {:>3}. {} ({} answered)",
            i + 1,
            analysis::normalize_header(header),
            answered
        );
    }

    Ok(0)
}

/// Keep the charts named by --chart, or all charts when none are named.
fn select_charts(all: &[ChartConfig], wanted: &[String]) -> Result<Vec<ChartConfig>> {
    if wanted.is_empty() {
        return Ok(all.to_vec());
    }

    for name in wanted {
        if !all.iter().any(|c| &c.container == name) {
            bail!("Unknown chart container: {}", name);
        }
    }

    Ok(all
        .iter()
        .filter(|c| wanted.contains(&c.container))
        .cloned()
        .collect())
}

/// Report path: --output, else config, else the format's default name.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }

    // The stock config name is Markdown; switch extension for JSON
    let markdown_default = OutputFormat::Markdown.default_output();
    if args.format == OutputFormat::Json && config.general.output == markdown_default {
        return PathBuf::from(OutputFormat::Json.default_output());
    }

    PathBuf::from(&config.general.output)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args, dir: &Path) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a present but broken file is an error
    match Config::load_from_dir(dir)? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
