//! Error taxonomy for measurement runs.

use isobench_ipc::FrameError;
use std::any::Any;
use std::fmt::Display;
use thiserror::Error;

/// A failure raised by the work unit during a trial.
///
/// Carries the same shape whether the trial ran in-process or was
/// transported back from a child process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TrialFailure {
    /// `"panic"` for panics, otherwise the error's type name
    pub kind: String,
    /// Panic payload or the error's `Display` output
    pub message: String,
}

impl TrialFailure {
    /// Kind recorded for caught panics
    pub const PANIC: &'static str = "panic";

    /// Create a failure from its parts
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Build a failure from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self::new(Self::PANIC, message)
    }

    /// Build a failure from an error returned by a fallible work unit
    pub fn from_error<E: Display>(error: &E) -> Self {
        Self::new(std::any::type_name::<E>(), error.to_string())
    }

    /// Whether the work unit panicked
    pub fn is_panic(&self) -> bool {
        self.kind == Self::PANIC
    }
}

/// Errors that abort a measurement run.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// Trial count resolved to less than 1
    #[error("Repeat value: {0} needs to be greater than 0")]
    InvalidTrialCount(u64),

    /// The work unit failed during a warmup or measured trial
    #[error(transparent)]
    WorkUnit(#[from] TrialFailure),

    /// The child's payload could not be decoded
    #[error("failed to decode trial result: {0}")]
    Transport(#[source] FrameError),

    /// The host refused to create the pipe or child process
    #[error("failed to isolate trial: {0}")]
    Isolation(#[source] std::io::Error),

    /// Writing to the progress sink failed
    #[error("failed to write progress: {0}")]
    Progress(#[source] std::io::Error),
}

impl MeasureError {
    /// The work-unit failure, if this error carries one
    pub fn failure(&self) -> Option<&TrialFailure> {
        match self {
            MeasureError::WorkUnit(failure) => Some(failure),
            _ => None,
        }
    }
}
