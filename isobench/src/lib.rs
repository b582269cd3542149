#![warn(missing_docs)]
//! # isobench
//!
//! Execution-time measurement for small snippets, with every trial isolated
//! in its own process.
//!
//! - **Process Isolation**: each trial runs in a freshly forked child, so heap
//!   state left by one trial cannot bias the next
//! - **Warmup Cycles**: discarded trials before measurement
//! - **Heap Control**: allocator memory is released before every trial and
//!   trimming can be suspended while the work unit runs
//! - **Bounded IPC**: the child reports one validated rkyv frame, either a
//!   duration or a failure
//! - **Summary**: arithmetic mean and population standard deviation, in seconds
//!
//! ## Quick Start
//!
//! ```no_run
//! use isobench::{ExecutionTime, MeasureConfig};
//!
//! let config = MeasureConfig::default().with_samples(10).with_warmup(2);
//! let summary = ExecutionTime::new(config)
//!     .run(|| "x".repeat(1024))
//!     .unwrap();
//! println!("{:.6}s ± {:.6}s", summary.average, summary.std_dev);
//! ```
//!
//! ## Fallible Work
//!
//! ```no_run
//! use isobench::{ExecutionTime, MeasureConfig};
//!
//! let mut execution = ExecutionTime::new(MeasureConfig::default());
//! let result = execution.run_fallible(|| std::fs::read_to_string("Cargo.toml"));
//! ```

// Re-export core types
pub use isobench_core::{
    DEFAULT_SAMPLES, DEFAULT_WARMUP, ExecutionTime, HeapControl, InProcess, MeasureConfig,
    MeasureError, NoopHeap, RunPhase, SystemHeap, TrialExecutor, TrialFailure, WorkFn,
    isolation_supported, realtime, run, run_warmup, select_executor,
};

#[cfg(unix)]
pub use isobench_core::ChildProcess;

// Re-export stats
pub use isobench_stats::{Summary, average, compute_summary, std_dev};

// Re-export wire format
pub use isobench_ipc::{FrameError, TrialOutcome};

/// Command-line boundary: config discovery, environment overrides, CLI entry point
pub mod cli {
    pub use isobench_cli::{
        Cli, CommandError, EnvOverrides, IsobenchConfig, IsolationMode, RunnerConfig,
        ShellCommand, build_measure_config, format_summary, run,
    };
}
