//! IPC Message Types
//!
//! The child writes exactly one [`TrialOutcome`] per trial.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// Result of one isolated trial, as sent from child to parent.
#[derive(Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum TrialOutcome {
    /// The work unit completed
    Elapsed {
        /// Wall-clock duration of the single invocation, in seconds
        seconds: f64,
    },

    /// The work unit failed
    Failure {
        /// Failure category: `"panic"` or the error's type name
        kind: String,
        /// Human-readable failure message
        message: String,
    },
}

impl TrialOutcome {
    /// Successful trial taking `seconds`
    pub fn elapsed(seconds: f64) -> Self {
        Self::Elapsed { seconds }
    }

    /// Failed trial
    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
