//! Chart building.
//!
//! This module runs the aggregation pipeline for every configured chart.

pub mod pipeline;

pub use pipeline::ChartBuilder;
