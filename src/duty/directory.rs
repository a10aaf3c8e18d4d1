//! Member directory
//!
//! Supplies the roster of eligible members for a duty kind. The roster's
//! source of truth is the `[[member]]` list in `rota.toml`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use toml_edit::{value, DocumentMut, Item};

use crate::duty::config::RotaConfig;
use crate::duty::{DutyKind, Member};
use crate::error::DirectoryError;

/// Source of the eligible roster for a duty kind.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Active members that pass the duty kind's eligibility predicate, in
    /// roster order.
    async fn list_members(&self, kind: DutyKind) -> Result<Vec<Member>, DirectoryError>;
}

/// Filter a roster down to the pool for `kind` under `config`.
#[must_use]
pub fn eligible_members(config: &RotaConfig, kind: DutyKind) -> Vec<Member> {
    let profile = config.profile(kind);
    config
        .members
        .iter()
        .filter(|m| m.is_eligible(profile.requires.as_deref()))
        .cloned()
        .collect()
}

/// Directory over an already-loaded configuration.
pub struct StaticDirectory {
    config: RotaConfig,
}

impl StaticDirectory {
    /// Wrap a loaded configuration
    #[must_use]
    pub const fn new(config: RotaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MemberDirectory for StaticDirectory {
    async fn list_members(&self, kind: DutyKind) -> Result<Vec<Member>, DirectoryError> {
        Ok(eligible_members(&self.config, kind))
    }
}

/// Directory that re-reads `rota.toml` on every call, so roster edits take
/// effect without restarting anything.
pub struct RosterFileDirectory {
    path: PathBuf,
}

impl RosterFileDirectory {
    /// Create a directory backed by the given config file
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MemberDirectory for RosterFileDirectory {
    async fn list_members(&self, kind: DutyKind) -> Result<Vec<Member>, DirectoryError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let config =
            RotaConfig::parse(&content).map_err(|e| DirectoryError::Invalid(format!("{e:#}")))?;
        Ok(eligible_members(&config, kind))
    }
}

/// Set a member's `active` flag in `rota.toml`, preserving the rest of the
/// file as written.
///
/// Returns `true` if the flag changed.
pub fn set_member_active(path: &Path, username: &str, active: bool) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let (updated, changed) = edit_member_active(&content, username, active)?;
    if changed {
        std::fs::write(path, updated)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    }
    Ok(changed)
}

fn edit_member_active(content: &str, username: &str, active: bool) -> Result<(String, bool)> {
    let mut doc: DocumentMut = content.parse().context("Failed to parse rota.toml")?;

    let Some(members) = doc.get_mut("member").and_then(Item::as_array_of_tables_mut) else {
        bail!("No [[member]] entries in rota.toml");
    };

    let Some(table) = members
        .iter_mut()
        .find(|t| t.get("username").and_then(Item::as_str) == Some(username))
    else {
        bail!("Unknown member '{username}'");
    };

    let current = table
        .get("active")
        .and_then(Item::as_bool)
        .unwrap_or(true);
    if current == active {
        return Ok((content.to_string(), false));
    }

    table["active"] = value(active);
    Ok((doc.to_string(), true))
}
