//! Duty rotation
//!
//! Cycle tracking and fair selection. Cycle state is never stored: it is
//! derived on every read from the append-only assignment log, which is the
//! single source of truth.

pub mod assigner;
pub mod engine;
pub mod log;
pub mod recorder;
pub mod store;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duty::DutyKind;

/// One round in which every eligible member is assigned at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// Duty kind this cycle belongs to
    pub duty_kind: DutyKind,
    /// Monotonic id starting at 1; 0 means no history yet
    pub cycle_id: u32,
    /// Distinct members already assigned in this cycle
    pub assigned_member_ids: BTreeSet<u32>,
}

impl Cycle {
    /// A cycle with nobody assigned yet
    #[must_use]
    pub const fn empty(duty_kind: DutyKind, cycle_id: u32) -> Self {
        Self {
            duty_kind,
            cycle_id,
            assigned_member_ids: BTreeSet::new(),
        }
    }
}

/// An immutable fact: a member was assigned a duty within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Sequential id within the log
    pub id: u64,
    /// Who was assigned
    pub member_id: u32,
    /// What they were assigned
    pub duty_kind: DutyKind,
    /// The cycle the assignment counts toward
    pub cycle_id: u32,
    /// When the assignment was recorded
    pub assigned_at: DateTime<Utc>,
}

/// An assignment that has not been written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAssignment {
    /// Who was assigned
    pub member_id: u32,
    /// What they were assigned
    pub duty_kind: DutyKind,
    /// The cycle the assignment counts toward
    pub cycle_id: u32,
}
