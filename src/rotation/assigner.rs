//! Duty assigner
//!
//! Drives one assignment end to end: fetch the roster, read the current
//! cycle, select, start a new cycle at most once if everyone has had a
//! turn, notify, then record under the cycle that was selected against.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::duty::directory::MemberDirectory;
use crate::duty::{DutyKind, Member};
use crate::error::AssignError;
use crate::notify::Notifier;
use crate::rotation::engine::{available_members, select_next, Selection};
use crate::rotation::log::AssignmentLog;
use crate::rotation::recorder::AssignmentRecorder;
use crate::rotation::store::CycleStore;
use crate::rotation::{Assignment, Cycle};

/// How an assignment request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// A member was selected (and recorded, unless dry run)
    Assigned,
    /// Nothing to do this period
    Skipped,
    /// Nobody is eligible for the duty
    NoEligibleMembers,
    /// The roster, cycle or log could not be read or written
    InternalFailure,
}

/// Result of an assignment request, suitable for display or JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    /// Duty that was requested
    pub duty_kind: DutyKind,
    /// How the request ended
    pub status: AssignmentStatus,
    /// Human-readable summary
    pub message: String,
    /// Selected member, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    /// Cycle the member was selected in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<u32>,
    /// Whether a new cycle was started for this selection
    pub cycle_reset: bool,
    /// Whether the notification was delivered
    pub notified: bool,
    /// The recorded assignment; absent on dry runs and failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Assignment>,
}

impl AssignmentReport {
    fn failed(duty_kind: DutyKind, status: AssignmentStatus, message: String) -> Self {
        Self {
            duty_kind,
            status,
            message,
            member: None,
            cycle_id: None,
            cycle_reset: false,
            notified: false,
            assignment: None,
        }
    }

    /// Report for a request that was off-cycle.
    #[must_use]
    pub fn skipped(duty_kind: DutyKind) -> Self {
        Self::failed(
            duty_kind,
            AssignmentStatus::Skipped,
            format!("Not assigning {duty_kind} duty this period."),
        )
    }

    /// Whether the request ended without an error
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(
            self.status,
            AssignmentStatus::Assigned | AssignmentStatus::Skipped
        )
    }
}

/// Where a duty kind's rotation currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationStatus {
    /// The current cycle
    pub cycle: Cycle,
    /// Eligible members who have had their turn this cycle
    pub done: Vec<Member>,
    /// Eligible members still due this cycle
    pub due: Vec<Member>,
}

/// A selected member together with the cycle it counts toward.
struct Pick<'a> {
    member: &'a Member,
    cycle: Cycle,
    reset: bool,
}

/// Orchestrates selection, notification and recording for a duty.
pub struct DutyAssigner<R = StdRng> {
    directory: Arc<dyn MemberDirectory>,
    store: CycleStore,
    recorder: AssignmentRecorder,
    notifier: Arc<dyn Notifier>,
    rng: R,
    dry_run: bool,
}

impl<R: Rng + Send> DutyAssigner<R> {
    /// Create an assigner over the given collaborators.
    ///
    /// `rng` drives member selection; pass a seeded generator for
    /// reproducible picks.
    pub fn new(
        directory: Arc<dyn MemberDirectory>,
        log: Arc<dyn AssignmentLog>,
        notifier: Arc<dyn Notifier>,
        rng: R,
    ) -> Self {
        Self {
            directory,
            store: CycleStore::new(log.clone()),
            recorder: AssignmentRecorder::new(log),
            notifier,
            rng,
            dry_run: false,
        }
    }

    /// Select without notifying or recording
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Assign `kind` to the next member in the rotation.
    ///
    /// Never returns an error: every failure is folded into the report's
    /// status and message.
    pub async fn assign(&mut self, kind: DutyKind) -> AssignmentReport {
        let roster = match self.directory.list_members(kind).await {
            Ok(roster) => roster,
            Err(e) => {
                error!(duty = %kind, error = %e, "failed to fetch roster");
                return AssignmentReport::failed(
                    kind,
                    AssignmentStatus::NoEligibleMembers,
                    format!("No members eligible for {kind} duty: {e}"),
                );
            }
        };

        let pick = match self.pick(kind, &roster).await {
            Ok(pick) => pick,
            Err(AssignError::NoEligibleMembers(_)) => {
                warn!(duty = %kind, "no members eligible, aborting");
                return AssignmentReport::failed(
                    kind,
                    AssignmentStatus::NoEligibleMembers,
                    format!("No members eligible for {kind} duty"),
                );
            }
            Err(e) => {
                error!(duty = %kind, error = %e, "failed to select member");
                return AssignmentReport::failed(
                    kind,
                    AssignmentStatus::InternalFailure,
                    format!("Failed to select member for {kind} duty: {e}"),
                );
            }
        };

        let member = pick.member.clone();
        let cycle_id = pick.cycle.cycle_id;
        info!(
            duty = %kind,
            member_id = member.id,
            username = %member.username,
            cycle_id,
            "selected member"
        );

        let mut report = AssignmentReport {
            duty_kind: kind,
            status: AssignmentStatus::Assigned,
            message: String::new(),
            member: Some(member.clone()),
            cycle_id: Some(cycle_id),
            cycle_reset: pick.reset,
            notified: false,
            assignment: None,
        };

        if self.dry_run {
            report.message = format!(
                "Would assign {kind} duty to {} (cycle {cycle_id}).",
                member.username
            );
            return report;
        }

        match self.notifier.notify(&member, kind).await {
            Ok(()) => report.notified = true,
            Err(e) => {
                error!(duty = %kind, username = %member.username, error = %e, "failed to send notification");
            }
        }

        match self.recorder.record(member.id, kind, cycle_id).await {
            Ok(assignment) => {
                report.assignment = Some(assignment);
                report.message = format!("Assigned {kind} duty to {}.", member.username);
            }
            Err(e) => {
                report.status = AssignmentStatus::InternalFailure;
                report.message = format!("Failed to record assignment: {e}");
            }
        }

        report
    }

    /// Select from the current cycle, starting a new one at most once.
    async fn pick<'a>(
        &mut self,
        kind: DutyKind,
        roster: &'a [Member],
    ) -> Result<Pick<'a>, AssignError> {
        let mut cycle = self.store.current_cycle(kind).await?;
        if cycle.cycle_id == 0 {
            // No history yet: the first real cycle is 1
            cycle = self.store.start_new_cycle(kind).await?;
        }
        match select_next(roster, &cycle, &mut self.rng) {
            Selection::Selected(member) => {
                return Ok(Pick {
                    member,
                    cycle,
                    reset: false,
                })
            }
            Selection::NoEligibleMembers => return Err(AssignError::NoEligibleMembers(kind)),
            Selection::CycleExhausted => {
                info!(duty = %kind, cycle_id = cycle.cycle_id, "everyone has had a turn");
            }
        }

        let fresh = self.store.start_new_cycle(kind).await?;
        match select_next(roster, &fresh, &mut self.rng) {
            Selection::Selected(member) => Ok(Pick {
                member,
                cycle: fresh,
                reset: true,
            }),
            Selection::NoEligibleMembers | Selection::CycleExhausted => {
                Err(AssignError::NoEligibleMembers(kind))
            }
        }
    }

    /// Where the rotation for `kind` stands right now.
    pub async fn status(&self, kind: DutyKind) -> Result<RotationStatus, AssignError> {
        rotation_status(self.directory.as_ref(), &self.store, kind).await
    }
}

/// Split the eligible roster for `kind` into who has had a turn in the
/// current cycle and who is still due.
pub async fn rotation_status(
    directory: &dyn MemberDirectory,
    store: &CycleStore,
    kind: DutyKind,
) -> Result<RotationStatus, AssignError> {
    let roster = directory.list_members(kind).await?;
    let cycle = store.current_cycle(kind).await?;
    let due_ids: BTreeSet<u32> = available_members(&roster, &cycle)
        .iter()
        .map(|m| m.id)
        .collect();

    let (due, done): (Vec<Member>, Vec<Member>) =
        roster.into_iter().partition(|m| due_ids.contains(&m.id));
    Ok(RotationStatus { cycle, done, due })
}
