//! Rota configuration parser
//!
//! Parses `rota.toml` into the roster, per-duty settings and notifier
//! settings.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::duty::{DutyKind, Member};
use crate::notify::NotifierConfig;

/// Global configuration shared across all duties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Directory holding the assignment log (default: `.rota`)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Upper bound on any single assignment log operation (default: 5)
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".rota")
}

const fn default_store_timeout_secs() -> u64 {
    5
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_timeout_secs: default_store_timeout_secs(),
        }
    }
}

impl GlobalConfig {
    /// The store timeout as a `Duration`.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

/// Per-duty overrides from a `[duty.<kind>]` table.
///
/// Every field is optional; unset fields fall back to the built-in
/// profile for that kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DutyConfig {
    /// What the assignee has to do, e.g. "clean the fridge"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Name the notification is posted under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    /// Avatar for the notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Opening lines, one is picked at random per notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greetings: Option<Vec<String>>,
    /// Member flag required to be in the pool. An empty string means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
}

/// Fully resolved settings for one duty kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyProfile {
    /// The duty kind these settings belong to
    pub kind: DutyKind,
    /// What the assignee has to do
    pub task: String,
    /// Name the notification is posted under
    pub bot_name: String,
    /// Avatar for the notification
    pub icon_url: Option<String>,
    /// Opening lines for the notification
    pub greetings: Vec<String>,
    /// Member flag required to be in the pool
    pub requires: Option<String>,
}

impl DutyProfile {
    /// Built-in settings for a duty kind.
    #[must_use]
    pub fn builtin(kind: DutyKind) -> Self {
        let (task, bot_name, requires, greetings): (&str, &str, Option<&str>, &[&str]) =
            match kind {
                DutyKind::Coffee => (
                    "clean the coffee machine",
                    "Java Janitor",
                    Some("coffee_drinker"),
                    &[
                        "Hey team!",
                        "Good afternoon, coffee lovers!",
                        "Your biweekly coffee reminder is here!",
                        "Time for our coffee care update!",
                        "Ready for a fresh brew?",
                    ],
                ),
                DutyKind::Fridge => (
                    "clean the fridge",
                    "Fridge Warden",
                    None,
                    &[
                        "Hey team!",
                        "Your monthly fridge reminder is here!",
                        "Time for our fridge care update!",
                        "Ready for a fresh fridge?",
                        "Hello, clean fridge champions!",
                    ],
                ),
            };

        Self {
            kind,
            task: task.to_string(),
            bot_name: bot_name.to_string(),
            icon_url: None,
            greetings: greetings.iter().map(ToString::to_string).collect(),
            requires: requires.map(ToString::to_string),
        }
    }

    fn with_overrides(mut self, overrides: &DutyConfig) -> Self {
        if let Some(task) = &overrides.task {
            self.task.clone_from(task);
        }
        if let Some(bot_name) = &overrides.bot_name {
            self.bot_name.clone_from(bot_name);
        }
        if overrides.icon_url.is_some() {
            self.icon_url.clone_from(&overrides.icon_url);
        }
        if let Some(greetings) = &overrides.greetings {
            self.greetings.clone_from(greetings);
        }
        if let Some(requires) = &overrides.requires {
            self.requires = Some(requires.clone()).filter(|r| !r.trim().is_empty());
        }
        self
    }
}

/// Top-level configuration parsed from `rota.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotaConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Webhook notifier configuration
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Per-duty overrides, keyed by duty kind
    #[serde(default, rename = "duty")]
    pub duties: BTreeMap<DutyKind, DutyConfig>,
    /// The roster
    #[serde(default, rename = "member")]
    pub members: Vec<Member>,
}

impl RotaConfig {
    /// Parse a rota.toml file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse rota.toml content from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse rota.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved settings for a duty kind
    #[must_use]
    pub fn profile(&self, kind: DutyKind) -> DutyProfile {
        let builtin = DutyProfile::builtin(kind);
        match self.duties.get(&kind) {
            Some(overrides) => builtin.with_overrides(overrides),
            None => builtin,
        }
    }

    /// Resolved settings for every duty kind
    #[must_use]
    pub fn profiles(&self) -> BTreeMap<DutyKind, DutyProfile> {
        DutyKind::ALL
            .into_iter()
            .map(|kind| (kind, self.profile(kind)))
            .collect()
    }

    /// Find a member by username
    #[must_use]
    pub fn get_member(&self, username: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.username == username)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut usernames = HashSet::new();
        for member in &self.members {
            if member.username.trim().is_empty() {
                bail!("Member {} has an empty username", member.id);
            }
            if !ids.insert(member.id) {
                bail!("Duplicate member id: {}", member.id);
            }
            if !usernames.insert(member.username.as_str()) {
                bail!("Duplicate member username: '{}'", member.username);
            }
        }

        if self.global.store_timeout_secs == 0 {
            bail!("global.store_timeout_secs must be greater than zero");
        }
        if self.notifier.timeout_secs == 0 {
            bail!("notifier.timeout_secs must be greater than zero");
        }

        if let Some(url) = &self.notifier.webhook_url {
            validate_webhook_url(url)?;
        }

        for (kind, duty) in &self.duties {
            if let Some(greetings) = &duty.greetings {
                if greetings.iter().any(|g| g.trim().is_empty()) {
                    bail!("duty.{kind}.greetings contains an empty greeting");
                }
            }
        }

        Ok(())
    }
}

/// Validate that a webhook URL is an absolute http(s) URL.
pub fn validate_webhook_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .with_context(|| format!("Invalid webhook URL '{url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid webhook URL '{url}': expected http:// or https://");
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => bail!("Invalid webhook URL '{url}': missing host"),
    }
}
