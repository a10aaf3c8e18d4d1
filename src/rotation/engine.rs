//! Rotation engine
//!
//! Pure selection over a roster and a cycle. The engine never touches the
//! log and never resets a cycle itself: exhaustion is reported to the
//! caller, which starts the next cycle and asks again exactly once.

use std::collections::BTreeMap;

use rand::seq::IteratorRandom;
use rand::Rng;

use crate::duty::Member;
use crate::rotation::Cycle;

/// Outcome of one selection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    /// A member who has not yet had a turn in this cycle
    Selected(&'a Member),
    /// Everyone on the roster has had a turn; a new cycle is needed
    CycleExhausted,
    /// The roster is empty
    NoEligibleMembers,
}

/// Roster members not yet assigned in `cycle`, one per id, ordered by id.
#[must_use]
pub fn available_members<'a>(roster: &'a [Member], cycle: &Cycle) -> Vec<&'a Member> {
    roster
        .iter()
        .filter(|m| !cycle.assigned_member_ids.contains(&m.id))
        .map(|m| (m.id, m))
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect()
}

/// Pick the next member for a duty, uniformly at random among those still
/// due in `cycle`.
pub fn select_next<'a, R>(roster: &'a [Member], cycle: &Cycle, rng: &mut R) -> Selection<'a>
where
    R: Rng + ?Sized,
{
    if roster.is_empty() {
        return Selection::NoEligibleMembers;
    }

    available_members(roster, cycle)
        .into_iter()
        .choose(rng)
        .map_or(Selection::CycleExhausted, Selection::Selected)
}
