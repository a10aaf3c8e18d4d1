//! Rota - fair duty rotation runner
//!
//! Rota hands out recurring office duties so that every eligible member
//! takes exactly one turn before anyone repeats. Each assignment is
//! announced over a chat webhook and appended to a durable log; the
//! rotation's cycle state is always derived from that log.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod cli;
pub mod duty;
pub mod error;
pub mod notify;
pub mod rotation;
pub mod schedule;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use duty::config::{DutyProfile, RotaConfig};
pub use duty::directory::{MemberDirectory, RosterFileDirectory, StaticDirectory};
pub use duty::{DutyKind, Member};
pub use error::{AssignError, DirectoryError, NotifyError, PersistenceError};
pub use notify::{Notifier, NotifierConfig, WebhookNotifier};
pub use rotation::assigner::{
    rotation_status, AssignmentReport, AssignmentStatus, DutyAssigner, RotationStatus,
};
pub use rotation::engine::{select_next, Selection};
pub use rotation::log::{AssignmentLog, JsonlAssignmentLog, MemoryAssignmentLog};
pub use rotation::recorder::AssignmentRecorder;
pub use rotation::store::CycleStore;
pub use rotation::{Assignment, Cycle};
