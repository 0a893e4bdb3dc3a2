//! Analysis modules.
//!
//! Field resolution, categorical aggregation and numeric binning. Everything
//! here is pure: no I/O, no shared state.

pub mod aggregator;
pub mod fields;
pub mod histogram;

pub use aggregator::*;
pub use fields::{normalize_header, resolve_field};
pub use histogram::bin_numeric;
