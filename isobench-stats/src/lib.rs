#![warn(missing_docs)]
//! isobench Statistical Reduction
//!
//! Reduces the durations collected across measured trials into the
//! `(average, standard deviation)` pair returned to callers.

mod summary;

pub use summary::{Summary, average, compute_summary, std_dev};
