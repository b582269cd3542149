#![warn(missing_docs)]
//! isobench Core - Trial Runner and Measurement Orchestrator
//!
//! This crate provides the execution engine:
//! - `TrialExecutor` strategies: `InProcess` and fork-based `ChildProcess`
//! - `ExecutionTime` orchestrator: warmup, measured trials, aggregation
//! - `HeapControl` hooks forced around every trial
//! - Wall-clock timing helpers

mod config;
mod error;
mod execution_time;
mod executor;
mod heap;
mod measure;

pub use config::MeasureConfig;
pub use error::{MeasureError, TrialFailure};
pub use execution_time::{ExecutionTime, RunPhase};
#[cfg(unix)]
pub use executor::ChildProcess;
pub use executor::{InProcess, TrialExecutor, WorkFn, isolation_supported, select_executor};
pub use heap::{HeapControl, NoopHeap, SystemHeap};
pub use measure::{Timer, realtime, time_once};

pub use isobench_stats::Summary;

/// Default number of measured trials
pub const DEFAULT_SAMPLES: u64 = 30;

/// Default number of warmup trials
pub const DEFAULT_WARMUP: u64 = 1;

/// Measure `work` with the given configuration.
///
/// Shorthand for `ExecutionTime::new(config).run(work)`.
pub fn run<F, R>(config: MeasureConfig, work: F) -> Result<Summary, MeasureError>
where
    F: FnMut() -> R,
{
    ExecutionTime::new(config).run(work)
}

/// Run only the configured warmup cycles, returning how many were executed.
pub fn run_warmup<F, R>(config: MeasureConfig, work: F) -> Result<u64, MeasureError>
where
    F: FnMut() -> R,
{
    ExecutionTime::new(config).run_warmup(work)
}
