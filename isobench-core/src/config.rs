//! Per-run measurement configuration.
//!
//! Environment variables are translated into this struct at the boundary;
//! the engine itself never reads process state.

use crate::error::MeasureError;
use crate::executor::isolation_supported;
use crate::{DEFAULT_SAMPLES, DEFAULT_WARMUP};

/// Configuration for one orchestration call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureConfig {
    /// Measured trial count used when no explicit count is given
    pub samples: u64,
    /// Warmup trials run before measurement, durations discarded
    pub warmup: u64,
    /// Run each trial in a forked child process
    pub subprocess: bool,
    /// Suspend automatic heap trimming inside the child for the duration of the call
    pub disable_gc: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            warmup: DEFAULT_WARMUP,
            subprocess: isolation_supported(),
            disable_gc: false,
        }
    }
}

impl MeasureConfig {
    /// Set the default trial count
    pub fn with_samples(mut self, samples: u64) -> Self {
        self.samples = samples;
        self
    }

    /// Set the warmup count
    pub fn with_warmup(mut self, warmup: u64) -> Self {
        self.warmup = warmup;
        self
    }

    /// Enable or disable process isolation
    pub fn with_subprocess(mut self, subprocess: bool) -> Self {
        self.subprocess = subprocess;
        self
    }

    /// Enable or disable heap-trim suspension inside the child
    pub fn with_disable_gc(mut self, disable_gc: bool) -> Self {
        self.disable_gc = disable_gc;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), MeasureError> {
        if self.samples < 1 {
            return Err(MeasureError::InvalidTrialCount(self.samples));
        }
        Ok(())
    }
}
