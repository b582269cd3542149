//! Wall-Clock Timing
//!
//! Timestamps are taken immediately around the work unit; panics are caught
//! so a failing trial still yields a value the caller can report.

use crate::error::TrialFailure;
use crate::executor::WorkFn;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

/// Timer for measuring a single invocation
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed wall-clock time
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed wall-clock time in seconds
    #[inline(always)]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

/// Run `f` once and return its elapsed seconds alongside its value.
#[inline]
pub fn realtime<F, R>(f: F) -> (f64, R)
where
    F: FnOnce() -> R,
{
    let timer = Timer::start();
    let value = f();
    (timer.elapsed_secs(), value)
}

/// Time exactly one invocation of `work`, capturing panics and returned failures.
pub fn time_once(work: &mut WorkFn<'_>) -> Result<f64, TrialFailure> {
    let (seconds, result) = realtime(|| catch_unwind(AssertUnwindSafe(&mut *work)));
    match result {
        Ok(Ok(())) => Ok(seconds),
        Ok(Err(failure)) => Err(failure),
        Err(payload) => Err(TrialFailure::from_panic(payload)),
    }
}
