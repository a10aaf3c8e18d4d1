//! Assignment recorder
//!
//! Write side of the assignment log. The caller always supplies the cycle
//! id it selected against; the recorder never infers one.

use std::sync::Arc;

use tracing::{error, info};

use crate::duty::DutyKind;
use crate::error::PersistenceError;
use crate::rotation::log::AssignmentLog;
use crate::rotation::{Assignment, NewAssignment};

/// Appends assignments to the log.
pub struct AssignmentRecorder {
    log: Arc<dyn AssignmentLog>,
}

impl AssignmentRecorder {
    /// Create a recorder writing to `log`
    #[must_use]
    pub fn new(log: Arc<dyn AssignmentLog>) -> Self {
        Self { log }
    }

    /// Record that `member_id` took `kind` in `cycle_id`.
    ///
    /// Makes a single attempt. Once this returns `Ok`, the next
    /// `current_cycle` read for `kind` includes `member_id`.
    pub async fn record(
        &self,
        member_id: u32,
        kind: DutyKind,
        cycle_id: u32,
    ) -> Result<Assignment, PersistenceError> {
        let new = NewAssignment {
            member_id,
            duty_kind: kind,
            cycle_id,
        };

        match self.log.append(new).await {
            Ok(assignment) => {
                info!(
                    duty = %kind,
                    member_id,
                    cycle_id,
                    assignment_id = assignment.id,
                    "recorded assignment"
                );
                Ok(assignment)
            }
            Err(e) => {
                error!(duty = %kind, member_id, cycle_id, error = %e, "failed to record assignment");
                Err(e)
            }
        }
    }
}
