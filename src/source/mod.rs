//! Survey data source.
//!
//! Fetches CSV exports from a local path or an `http(s)` URL and parses them
//! into a [`Dataset`]. Every chart fetches on its own; nothing is cached.

pub mod csv;

use crate::error::ChartError;
use crate::models::{Dataset, Record};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Whether a location should be fetched over HTTP.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Build the HTTP client shared by all chart fetches.
pub fn build_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .context("Failed to create HTTP client")
}

/// Fetch the raw CSV text at `location`.
pub async fn fetch_text(location: &str, client: &reqwest::Client) -> Result<String, ChartError> {
    let unavailable = |reason: String| ChartError::DataSourceUnavailable {
        location: location.to_string(),
        reason,
    };

    if !is_remote(location) {
        debug!("Reading survey export from file: {}", location);
        return tokio::fs::read_to_string(location)
            .await
            .map_err(|e| unavailable(e.to_string()));
    }

    debug!("Fetching survey export: {}", location);
    let response = client.get(location).send().await.map_err(|e| {
        if e.is_timeout() {
            unavailable("request timed out".to_string())
        } else if e.is_connect() {
            unavailable("cannot connect".to_string())
        } else {
            unavailable(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(unavailable(format!("HTTP {}", response.status())));
    }

    response.text().await.map_err(|e| unavailable(e.to_string()))
}

/// Parse CSV text: first row is the header, the rest are records.
pub fn parse_dataset(text: &str) -> Dataset {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut rows = csv::parse_rows(text, ',').into_iter();

    let headers = match rows.next() {
        Some(headers) => headers,
        None => return Dataset::default(),
    };

    let records = rows
        .map(|row| {
            Record::from_pairs(
                headers
                    .iter()
                    .zip(row)
                    .map(|(header, value)| (header.clone(), value)),
            )
        })
        .collect();

    Dataset { headers, records }
}

/// Fetch and parse the export at `location`.
pub async fn load_dataset(location: &str, client: &reqwest::Client) -> Result<Dataset, ChartError> {
    let text = fetch_text(location, client).await?;
    let dataset = parse_dataset(&text);
    info!(
        "Loaded {} records ({} columns) from {}",
        dataset.records.len(),
        dataset.headers.len(),
        location
    );
    Ok(dataset)
}
