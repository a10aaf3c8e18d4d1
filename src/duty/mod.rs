//! Duties and the people who do them
//!
//! This module holds the duty kinds, the member record, the `rota.toml`
//! configuration and the member directory that turns the roster into the
//! eligible pool for a duty.

pub mod config;
pub mod directory;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which recurring duty is being rotated.
///
/// Each kind has its own rotation pool, eligibility predicate and cycle
/// history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DutyKind {
    /// Coffee machine cleaning
    Coffee,
    /// Fridge cleaning
    Fridge,
}

impl DutyKind {
    /// Every duty kind, in declaration order.
    pub const ALL: [Self; 2] = [Self::Coffee, Self::Fridge];

    /// Lowercase tag used in config keys and the assignment log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coffee => "coffee",
            Self::Fridge => "fridge",
        }
    }
}

impl fmt::Display for DutyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Unique, stable id
    pub id: u32,
    /// Chat handle, used for mentions
    pub username: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Named eligibility attributes (e.g. `coffee_drinker`)
    #[serde(default)]
    pub flags: BTreeSet<String>,
    /// Inactive members are never part of any pool
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl Member {
    /// Whether this member is in the pool for a duty requiring `flag`.
    #[must_use]
    pub fn is_eligible(&self, required_flag: Option<&str>) -> bool {
        self.active && required_flag.map_or(true, |flag| self.flags.contains(flag))
    }
}
