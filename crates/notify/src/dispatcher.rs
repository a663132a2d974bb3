//! Composes and sends the test email for a trigger reason.
//!
//! The dispatcher only reads configuration: it never touches schedule state,
//! so a manual send can never disturb the pending timer. One invocation is
//! one send attempt; a failed scheduled send simply waits for the next fire.

use std::sync::Arc;

use mailbeat_core::TaskConfiguration;
use mailbeat_scheduler::resolve_interval;

use crate::traits::{MailSender, SiteInfo};

/// Why a dispatch was triggered. Not persisted; passed at invocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchReason {
    /// The recurring timer matured.
    Scheduled,
    /// An operator asked for a test send now.
    Manual,
}

/// Dispatch failures, kept distinct so the caller can render accurate
/// guidance: a missing recipient is a precondition error, not a transport
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no recipient address is configured")]
    MissingRecipient,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("send failed: {0}")]
    Send(String),
}

/// Builds the test message and performs exactly one send attempt.
pub struct Dispatcher {
    sender: Arc<dyn MailSender>,
    site: Arc<dyn SiteInfo>,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn MailSender>, site: Arc<dyn SiteInfo>) -> Self {
        Self { sender, site }
    }

    /// Compose and send the test email for `reason`.
    ///
    /// Fails fast with [`DispatchError::MissingRecipient`] before touching
    /// the sender when no recipient is configured. Any transport outcome
    /// other than success maps uniformly to [`DispatchError::Send`] — no
    /// retries, no distinction between timeout and rejection.
    pub async fn dispatch(
        &self,
        reason: DispatchReason,
        config: &TaskConfiguration,
    ) -> Result<(), DispatchError> {
        let to = config.recipient().ok_or(DispatchError::MissingRecipient)?;

        // Scheduled messages carry the cadence so operators can confirm the
        // configuration took effect from the message alone.
        let label = match reason {
            DispatchReason::Scheduled => Some(
                resolve_interval(config)
                    .map_err(|e| DispatchError::Config(e.to_string()))?
                    .label,
            ),
            DispatchReason::Manual => None,
        };

        let subject = compose_subject(self.site.site_name(), reason, label.as_deref());
        let body = compose_body(reason, label.as_deref());

        self.sender
            .send(to, &subject, &body)
            .await
            .map_err(|e| DispatchError::Send(e.to_string()))
    }
}

/// Deterministic subject line for a trigger reason.
fn compose_subject(site_name: &str, reason: DispatchReason, label: Option<&str>) -> String {
    match reason {
        DispatchReason::Manual => format!("Test message from {site_name} (manual)"),
        DispatchReason::Scheduled => format!(
            "Scheduled test message from {site_name} ({})",
            label.unwrap_or("daily")
        ),
    }
}

/// Deterministic HTML body for a trigger reason.
fn compose_body(reason: DispatchReason, label: Option<&str>) -> String {
    match reason {
        DispatchReason::Manual => {
            "<p>This is a manually-initiated test message from mailbeat.</p>".to_string()
        }
        DispatchReason::Scheduled => format!(
            "<p>This is a scheduled test message from mailbeat.</p>\
             <p>Current cadence: {}.</p>",
            label.unwrap_or("daily")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MailError, StaticSite};
    use mailbeat_core::FrequencyKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockSender {
        send_count: AtomicUsize,
        last_message: Mutex<Option<(String, String, String)>>,
        should_fail: bool,
    }

    impl MockSender {
        fn new(should_fail: bool) -> Arc<Self> {
            Arc::new(Self {
                send_count: AtomicUsize::new(0),
                last_message: Mutex::new(None),
                should_fail,
            })
        }
    }

    #[async_trait::async_trait]
    impl MailSender for MockSender {
        async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            *self.last_message.lock().unwrap() =
                Some((to.to_string(), subject.to_string(), html_body.to_string()));
            if self.should_fail {
                Err(MailError::Smtp("mock failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn transport_name(&self) -> &str {
            "mock"
        }
    }

    fn dispatcher(sender: Arc<MockSender>) -> Dispatcher {
        Dispatcher::new(sender, Arc::new(StaticSite::new("Example Site")))
    }

    fn config(recipient: Option<&str>, frequency: FrequencyKind, custom_days: u32) -> TaskConfiguration {
        TaskConfiguration {
            recipient: recipient.map(String::from),
            frequency,
            custom_days,
        }
    }

    #[tokio::test]
    async fn manual_subject_and_body() {
        let sender = MockSender::new(false);
        dispatcher(sender.clone())
            .dispatch(
                DispatchReason::Manual,
                &config(Some("ops@example.com"), FrequencyKind::Weekly, 3),
            )
            .await
            .unwrap();

        let (to, subject, body) = sender.last_message.lock().unwrap().clone().unwrap();
        assert_eq!(to, "ops@example.com");
        assert_eq!(subject, "Test message from Example Site (manual)");
        assert!(body.contains("manually-initiated"));
        // Manual sends never mention the cadence.
        assert!(!body.contains("cadence"));
    }

    #[tokio::test]
    async fn scheduled_subject_carries_cadence_label() {
        let sender = MockSender::new(false);
        dispatcher(sender.clone())
            .dispatch(
                DispatchReason::Scheduled,
                &config(Some("ops@example.com"), FrequencyKind::CustomDays, 5),
            )
            .await
            .unwrap();

        let (_, subject, body) = sender.last_message.lock().unwrap().clone().unwrap();
        assert_eq!(
            subject,
            "Scheduled test message from Example Site (every 5 days)"
        );
        assert!(body.contains("Current cadence: every 5 days."));
    }

    #[tokio::test]
    async fn missing_recipient_fails_before_sender_is_called() {
        let sender = MockSender::new(false);
        let err = dispatcher(sender.clone())
            .dispatch(
                DispatchReason::Manual,
                &config(None, FrequencyKind::Daily, 3),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MissingRecipient));
        assert_eq!(sender.send_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sender_failure_maps_to_send_error() {
        let sender = MockSender::new(true);
        let err = dispatcher(sender.clone())
            .dispatch(
                DispatchReason::Scheduled,
                &config(Some("ops@example.com"), FrequencyKind::Daily, 3),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Send(_)));
        // Exactly one attempt, never retried.
        assert_eq!(sender.send_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scheduled_with_invalid_custom_days_is_config_error() {
        let sender = MockSender::new(false);
        let err = dispatcher(sender.clone())
            .dispatch(
                DispatchReason::Scheduled,
                &config(Some("ops@example.com"), FrequencyKind::CustomDays, 0),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Config(_)));
        assert_eq!(sender.send_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subjects_are_deterministic() {
        let a = compose_subject("S", DispatchReason::Scheduled, Some("weekly"));
        let b = compose_subject("S", DispatchReason::Scheduled, Some("weekly"));
        assert_eq!(a, b);
        assert_eq!(
            compose_subject("S", DispatchReason::Manual, None),
            "Test message from S (manual)"
        );
    }
}
