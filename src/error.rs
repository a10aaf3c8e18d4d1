//! Error taxonomy
//!
//! Each component converts its low-level faults into one of these typed
//! errors at its own boundary. Only the CLI layer flattens them into
//! `anyhow` for display.

use std::time::Duration;

use thiserror::Error;

use crate::duty::DutyKind;

/// Failure reading or writing the assignment log.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The operation did not finish within the configured bound
    #[error("assignment log operation '{op}' timed out after {}s", .after.as_secs_f32())]
    Timeout {
        /// Which operation timed out
        op: &'static str,
        /// The bound that was exceeded
        after: Duration,
    },

    /// The log file could not be opened, read or written
    #[error("assignment log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A committed line in the log is not a valid assignment
    #[error("assignment log is corrupt at line {line}: {source}")]
    Corrupt {
        /// 1-indexed line number
        line: usize,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// An assignment could not be serialized
    #[error("failed to serialize assignment: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The next cycle or assignment id does not fit its counter
    #[error("assignment log {counter} counter is exhausted")]
    Overflow {
        /// Which counter ran out
        counter: &'static str,
    },
}

/// Failure fetching the roster from the member directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The roster source could not be reached or read
    #[error("member directory unavailable: {0}")]
    Unavailable(String),

    /// The roster source was read but is not valid
    #[error("member directory is invalid: {0}")]
    Invalid(String),
}

/// Failure delivering a notification. Never fatal to an assignment.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No webhook URL was configured
    #[error("webhook URL is not configured")]
    NotConfigured,

    /// The request could not be sent or timed out
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The webhook answered with a non-success status
    #[error("webhook returned {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },
}

/// Why a duty could not be assigned.
#[derive(Debug, Error)]
pub enum AssignError {
    /// The roster is empty, before or after a cycle reset
    #[error("no members eligible for {0}")]
    NoEligibleMembers(DutyKind),

    /// The roster could not be fetched
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The cycle state could not be read or the assignment not recorded
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
