//! Cycle store
//!
//! Read side of the assignment log. Derives the current cycle for a duty
//! kind from the maximum cycle id in its history and the distinct members
//! recorded under it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::duty::DutyKind;
use crate::error::PersistenceError;
use crate::rotation::log::AssignmentLog;
use crate::rotation::{Assignment, Cycle};

/// Derives cycle state from the assignment log.
pub struct CycleStore {
    log: Arc<dyn AssignmentLog>,
}

impl CycleStore {
    /// Create a store reading from `log`
    #[must_use]
    pub fn new(log: Arc<dyn AssignmentLog>) -> Self {
        Self { log }
    }

    /// The cycle with the highest id seen for `kind`.
    ///
    /// With no history this is cycle 0 with nobody assigned.
    pub async fn current_cycle(&self, kind: DutyKind) -> Result<Cycle, PersistenceError> {
        let entries = self.log.read_all().await?;
        let cycle = derive_current_cycle(&entries, kind);
        debug!(
            duty = %kind,
            cycle_id = cycle.cycle_id,
            assigned = cycle.assigned_member_ids.len(),
            "read current cycle"
        );
        Ok(cycle)
    }

    /// The cycle that would follow the current one.
    ///
    /// Nothing is written: the cycle only exists once an assignment is
    /// recorded under it, so repeated calls return the same id until then.
    /// Fails with [`PersistenceError::Overflow`] once `u32::MAX` is reached.
    pub async fn start_new_cycle(&self, kind: DutyKind) -> Result<Cycle, PersistenceError> {
        let entries = self.log.read_all().await?;
        let next = max_cycle_id(&entries, kind)
            .checked_add(1)
            .ok_or(PersistenceError::Overflow { counter: "cycle id" })?;
        info!(duty = %kind, cycle_id = next, "starting new cycle");
        Ok(Cycle::empty(kind, next))
    }

    /// All assignments for `kind`, oldest first.
    pub async fn history(&self, kind: DutyKind) -> Result<Vec<Assignment>, PersistenceError> {
        let entries = self.log.read_all().await?;
        Ok(entries.into_iter().filter(|a| a.duty_kind == kind).collect())
    }
}

fn max_cycle_id(entries: &[Assignment], kind: DutyKind) -> u32 {
    entries
        .iter()
        .filter(|a| a.duty_kind == kind)
        .map(|a| a.cycle_id)
        .max()
        .unwrap_or(0)
}

/// Current cycle for `kind` over a snapshot of the log.
#[must_use]
pub fn derive_current_cycle(entries: &[Assignment], kind: DutyKind) -> Cycle {
    let cycle_id = max_cycle_id(entries, kind);
    let assigned_member_ids = entries
        .iter()
        .filter(|a| a.duty_kind == kind && a.cycle_id == cycle_id)
        .map(|a| a.member_id)
        .collect();

    Cycle {
        duty_kind: kind,
        cycle_id,
        assigned_member_ids,
    }
}
