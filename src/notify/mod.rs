//! Notifications
//!
//! Tells the selected member it is their turn. Delivery is best effort:
//! the assigner logs a failed notification and records the assignment
//! anyway.

pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::duty::config::DutyProfile;
use crate::duty::{DutyKind, Member};
use crate::error::NotifyError;

pub use webhook::{WebhookNotifier, WebhookPayload};

/// Informs a member about a new assignment.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the notification for `member` taking `kind`.
    async fn notify(&self, member: &Member, kind: DutyKind) -> Result<(), NotifyError>;
}

/// Webhook settings from the `[notifier]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Incoming webhook URL; notifications fail softly while unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Channel for live announcements
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Channel for test-mode announcements; the webhook default if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_channel: Option<String>,
    /// Page with cleaning instructions, linked from every message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_url: Option<String>,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_channel() -> String {
    "town-square".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            channel: default_channel(),
            test_channel: None,
            instructions_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Render the announcement text.
///
/// Live messages @-mention the member. Test messages use the bare
/// username so nobody gets pinged by a rehearsal.
#[must_use]
pub fn render_message(
    profile: &DutyProfile,
    username: &str,
    greeting: &str,
    instructions_url: Option<&str>,
    test_mode: bool,
) -> String {
    let mention = if test_mode {
        username.to_string()
    } else {
        format!("@{username}")
    };

    let mut text = format!(
        "{greeting}\nIt's {mention}'s turn to {} this week!",
        profile.task
    );
    if let Some(url) = instructions_url {
        text.push_str(&format!(
            " Click [here]({url}) for instructions, and to mark the job as completed."
        ));
    }
    text
}
