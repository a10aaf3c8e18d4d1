//! Trigger calendar
//!
//! Decides whether a given date falls in a period that warrants an
//! assignment. The rotation itself is unaware of time; only the CLI
//! consults these predicates before invoking it.

use chrono::{Datelike, Days, NaiveDate};

use crate::duty::DutyKind;

/// Coffee duty rotates every other week, on odd ISO weeks.
#[must_use]
pub fn is_coffee_week(date: NaiveDate) -> bool {
    date.iso_week().week() % 2 == 1
}

/// Fridge duty rotates on the last occurrence of the run's weekday in the
/// month, i.e. when a week later is already next month.
#[must_use]
pub fn is_fridge_day(date: NaiveDate) -> bool {
    date.checked_add_days(Days::new(7))
        .map_or(true, |next_week| next_week.month() != date.month())
}

/// Whether `kind` is due on `date`.
#[must_use]
pub fn is_due(kind: DutyKind, date: NaiveDate) -> bool {
    match kind {
        DutyKind::Coffee => is_coffee_week(date),
        DutyKind::Fridge => is_fridge_day(date),
    }
}
