//! Incoming-webhook notifier (Mattermost/Slack compatible payload)

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::duty::config::DutyProfile;
use crate::duty::{DutyKind, Member};
use crate::error::NotifyError;
use crate::notify::{render_message, Notifier, NotifierConfig};

const FALLBACK_GREETING: &str = "Hey team!";

/// JSON body posted to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    /// Message text (markdown)
    pub text: String,
    /// Display name of the posting bot
    pub username: String,
    /// Avatar of the posting bot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Target channel; the webhook's default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// Posts announcements to an incoming webhook.
pub struct WebhookNotifier {
    config: NotifierConfig,
    profiles: BTreeMap<DutyKind, DutyProfile>,
    test_mode: bool,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a notifier.
    ///
    /// `test_mode` routes messages to the test channel without mentions.
    pub fn new(
        config: NotifierConfig,
        profiles: BTreeMap<DutyKind, DutyProfile>,
        test_mode: bool,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            profiles,
            test_mode,
            client,
        })
    }

    fn profile(&self, kind: DutyKind) -> DutyProfile {
        self.profiles
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| DutyProfile::builtin(kind))
    }

    /// Build the payload announcing `member` for `kind`, picking a greeting
    /// with `rng`.
    pub fn build_payload<R: Rng + ?Sized>(
        &self,
        member: &Member,
        kind: DutyKind,
        rng: &mut R,
    ) -> WebhookPayload {
        let profile = self.profile(kind);
        let greeting = profile
            .greetings
            .choose(rng)
            .map_or(FALLBACK_GREETING, String::as_str);

        let channel = if self.test_mode {
            self.config.test_channel.clone()
        } else {
            Some(self.config.channel.clone())
        };

        WebhookPayload {
            text: render_message(
                &profile,
                &member.username,
                greeting,
                self.config.instructions_url.as_deref(),
                self.test_mode,
            ),
            username: profile.bot_name.clone(),
            icon_url: profile.icon_url.clone(),
            channel,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, member: &Member, kind: DutyKind) -> Result<(), NotifyError> {
        let Some(url) = self.config.webhook_url.as_deref() else {
            return Err(NotifyError::NotConfigured);
        };
        let payload = self.build_payload(member, kind, &mut rand::thread_rng());

        let resp = self.client.post(url).json(&payload).send().await?;

        if resp.status().is_success() {
            info!(duty = %kind, username = %member.username, "webhook notification sent");
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(NotifyError::Rejected { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_member;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn notifier(webhook_url: Option<String>, test_mode: bool) -> WebhookNotifier {
        let config = NotifierConfig {
            webhook_url,
            channel: "nycoffice".to_string(),
            test_channel: Some("@lotte".to_string()),
            ..NotifierConfig::default()
        };
        let profiles = DutyKind::ALL
            .into_iter()
            .map(|kind| (kind, DutyProfile::builtin(kind)))
            .collect();
        WebhookNotifier::new(config, profiles, test_mode).unwrap()
    }

    #[test]
    fn test_live_payload_targets_channel() {
        let notifier = notifier(None, false);
        let mut rng = StdRng::seed_from_u64(1);
        let payload = notifier.build_payload(&make_member(2, "abel"), DutyKind::Coffee, &mut rng);

        assert_eq!(payload.channel.as_deref(), Some("nycoffice"));
        assert_eq!(payload.username, "Java Janitor");
        assert!(payload.text.contains("@abel"));
    }

    #[test]
    fn test_test_payload_targets_test_channel() {
        let notifier = notifier(None, true);
        let mut rng = StdRng::seed_from_u64(1);
        let payload = notifier.build_payload(&make_member(2, "abel"), DutyKind::Fridge, &mut rng);

        assert_eq!(payload.channel.as_deref(), Some("@lotte"));
        assert_eq!(payload.username, "Fridge Warden");
        assert!(!payload.text.contains("@abel"));
    }

    #[test]
    fn test_greeting_comes_from_profile() {
        let notifier = notifier(None, false);
        let greetings = DutyProfile::builtin(DutyKind::Coffee).greetings;

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let payload =
                notifier.build_payload(&make_member(1, "lotte"), DutyKind::Coffee, &mut rng);
            let first_line = payload.text.lines().next().unwrap();
            assert!(greetings.iter().any(|g| g == first_line));
        }
    }

    #[test]
    fn test_payload_omits_absent_fields() {
        let payload = WebhookPayload {
            text: "hi".to_string(),
            username: "bot".to_string(),
            icon_url: None,
            channel: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"text": "hi", "username": "bot"}));
    }

    #[tokio::test]
    async fn test_notify_without_url_is_not_configured() {
        let notifier = notifier(None, true);
        let err = notifier
            .notify(&make_member(1, "lotte"), DutyKind::Coffee)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured));
    }

    #[tokio::test]
    async fn test_notify_posts_json_to_webhook() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/abc")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "username": "Java Janitor",
                "channel": "nycoffice",
            })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = notifier(Some(format!("{}/hooks/abc", server.url())), false);
        notifier
            .notify(&make_member(2, "abel"), DutyKind::Coffee)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_reports_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hooks/abc")
            .with_status(403)
            .with_body("invalid webhook")
            .create_async()
            .await;

        let notifier = notifier(Some(format!("{}/hooks/abc", server.url())), false);
        let err = notifier
            .notify(&make_member(2, "abel"), DutyKind::Coffee)
            .await
            .unwrap_err();

        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "invalid webhook");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
