//! Numeric binning for histogram charts.

use crate::models::{CategoryCount, Record};
use std::collections::BTreeMap;

/// Gaps between occupied bins are only filled below this span; wider
/// distributions keep only their occupied bins.
const MAX_FILLED_BINS: i64 = 200;

/// Parse a numeric answer; accepts `,` as decimal separator.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Bin numeric answers of `field` into `bin_width`-wide buckets.
///
/// Returns the bins in ascending order and the number of numeric responses.
/// Non-numeric and blank answers are skipped.
pub fn bin_numeric(records: &[Record], field: &str, bin_width: f64) -> (Vec<CategoryCount>, usize) {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|record| record.answer(field))
        .filter_map(parse_number)
        .collect();

    if values.is_empty() || bin_width <= 0.0 || !bin_width.is_finite() {
        return (Vec::new(), values.len());
    }

    // `as` saturates, so out-of-range values land in the outermost bins
    let mut bins: BTreeMap<i64, usize> = BTreeMap::new();
    for value in &values {
        *bins.entry((value / bin_width).floor() as i64).or_default() += 1;
    }

    if let (Some(&first), Some(&last)) = (bins.keys().next(), bins.keys().next_back()) {
        if last.checked_sub(first).is_some_and(|span| span < MAX_FILLED_BINS) {
            for index in first..=last {
                bins.entry(index).or_default();
            }
        }
    }

    let entries = bins
        .into_iter()
        .map(|(index, count)| {
            let start = index as f64 * bin_width;
            let label = format!("{}–{}", format_edge(start), format_edge(start + bin_width));
            CategoryCount::new(label, count)
        })
        .collect();

    (entries, values.len())
}

fn format_edge(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", (value * 1000.0).round() / 1000.0)
    }
}
