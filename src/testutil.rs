//! Shared test utilities
//!
//! Common helpers used across test modules. Only compiled in test builds.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::duty::directory::MemberDirectory;
use crate::duty::{DutyKind, Member};
use crate::error::{DirectoryError, NotifyError, PersistenceError};
use crate::notify::Notifier;
use crate::rotation::log::AssignmentLog;
use crate::rotation::{Assignment, NewAssignment};

/// Create an active `Member` with no flags.
#[must_use]
pub fn make_member(id: u32, username: &str) -> Member {
    Member {
        id,
        username: username.to_string(),
        full_name: None,
        flags: BTreeSet::new(),
        active: true,
    }
}

/// Create a recorded `Assignment` stamped now.
#[must_use]
pub fn make_assignment(id: u64, member_id: u32, duty_kind: DutyKind, cycle_id: u32) -> Assignment {
    Assignment {
        id,
        member_id,
        duty_kind,
        cycle_id,
        assigned_at: Utc::now(),
    }
}

#[derive(Clone, Copy)]
enum ReadFailure {
    None,
    Io,
    Timeout,
}

/// Assignment log whose writes always fail and whose reads may too.
pub struct FailingLog {
    reads: ReadFailure,
}

impl FailingLog {
    /// Reads succeed (empty), writes fail
    pub const fn writes() -> Self {
        Self {
            reads: ReadFailure::None,
        }
    }

    /// Reads and writes both fail
    pub const fn reads() -> Self {
        Self {
            reads: ReadFailure::Io,
        }
    }

    /// Reads hit the log's time bound
    pub const fn timeouts() -> Self {
        Self {
            reads: ReadFailure::Timeout,
        }
    }
}

#[async_trait]
impl AssignmentLog for FailingLog {
    async fn append(&self, _new: NewAssignment) -> Result<Assignment, PersistenceError> {
        Err(PersistenceError::Io(std::io::Error::other("disk full")))
    }

    async fn read_all(&self) -> Result<Vec<Assignment>, PersistenceError> {
        match self.reads {
            ReadFailure::None => Ok(Vec::new()),
            ReadFailure::Io => Err(PersistenceError::Io(std::io::Error::other(
                "connection refused",
            ))),
            ReadFailure::Timeout => Err(PersistenceError::Timeout {
                op: "read",
                after: Duration::from_millis(10),
            }),
        }
    }
}

/// Directory that is always unreachable.
pub struct FailingDirectory;

#[async_trait]
impl MemberDirectory for FailingDirectory {
    async fn list_members(&self, _kind: DutyKind) -> Result<Vec<Member>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".to_string()))
    }
}

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<(u32, DutyKind)>>,
}

impl RecordingNotifier {
    /// A notifier whose deliveries always fail (and are not remembered)
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(member_id, duty_kind)` for each delivered notification
    pub fn sent(&self) -> Vec<(u32, DutyKind)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, member: &Member, kind: DutyKind) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::NotConfigured);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((member.id, kind));
        Ok(())
    }
}
