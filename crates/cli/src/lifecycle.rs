//! Lifecycle controller: explicit wiring between the host's events and the
//! scheduler core / dispatcher.
//!
//! Holds direct references to both collaborators; nothing here is registered
//! by name or discovered at runtime. Activation, deactivation, configuration
//! writes, admin reads, and timer maturity each map to exactly one entry
//! point below.

use chrono::{DateTime, Utc};

use mailbeat_core::TaskConfiguration;
use mailbeat_notify::{DispatchError, DispatchReason, Dispatcher};
use mailbeat_scheduler::{SchedulerCore, SchedulerError};
use tracing::{debug, info, warn};

pub struct LifecycleController {
    scheduler: SchedulerCore,
    dispatcher: Dispatcher,
}

impl LifecycleController {
    pub fn new(scheduler: SchedulerCore, dispatcher: Dispatcher) -> Self {
        Self {
            scheduler,
            dispatcher,
        }
    }

    pub fn scheduler(&self) -> &SchedulerCore {
        &self.scheduler
    }

    /// Activation installs the initial schedule.
    pub fn on_activate(&self, config: &TaskConfiguration) -> Result<(), SchedulerError> {
        info!("activating");
        self.scheduler.install(config)
    }

    /// Deactivation tears the schedule down unconditionally.
    pub fn on_deactivate(&self) -> Result<(), SchedulerError> {
        info!("deactivating");
        self.scheduler.teardown()
    }

    /// Any of the three settings (recipient, frequency, custom days)
    /// changing rebuilds the whole schedule. No field-level diffing: a
    /// custom-days write while the frequency is daily still replaces the
    /// record, so a stale recurrence can never linger.
    pub fn on_configuration_changed(
        &self,
        config: &TaskConfiguration,
    ) -> Result<(), SchedulerError> {
        self.scheduler.install(config)
    }

    /// Integrity check for every admin read. Idempotent and cheap; failures
    /// are logged, never surfaced to the reader.
    pub fn on_admin_view(&self, config: &TaskConfiguration) {
        match self.scheduler.ensure_integrity(config) {
            Ok(true) => info!("schedule was missing and has been restored"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "integrity check failed"),
        }
    }

    /// One control-loop tick: repair drift, then dispatch if the timer
    /// matured.
    pub async fn on_tick(&self, config: &TaskConfiguration) {
        self.on_tick_at(config, Utc::now()).await;
    }

    /// [`on_tick`](Self::on_tick) with an explicit clock, for deterministic
    /// tests.
    pub async fn on_tick_at(&self, config: &TaskConfiguration, now: DateTime<Utc>) {
        self.on_admin_view(config);

        match self.scheduler.take_due(now) {
            Ok(Some(_fired)) => self.on_timer_due(config).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to poll timer"),
        }
    }

    /// The recurring timer matured: send with reason Scheduled. A failure is
    /// logged and dropped — the next attempt is the next scheduled fire.
    pub async fn on_timer_due(&self, config: &TaskConfiguration) {
        debug!(recipient = ?config.recipient(), "sending scheduled test email");
        if let Err(e) = self
            .dispatcher
            .dispatch(DispatchReason::Scheduled, config)
            .await
        {
            warn!(error = %e, "scheduled send failed; will retry at the next scheduled fire");
        }
    }

    /// Operator-initiated test send. Bypasses the scheduler entirely; the
    /// result is returned so the caller can tell a missing recipient from a
    /// transport failure.
    pub async fn send_test_now(&self, config: &TaskConfiguration) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(DispatchReason::Manual, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailbeat_core::FrequencyKind;
    use mailbeat_notify::{MailError, MailSender, StaticSite};
    use mailbeat_scheduler::{InMemoryTimer, TimerFacility};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TASK: &str = "mailbeat.test_email";

    struct CountingSender {
        sends: AtomicUsize,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl MailSender for CountingSender {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
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

    fn wire(should_fail: bool) -> (LifecycleController, Arc<InMemoryTimer>, Arc<CountingSender>) {
        let timer = Arc::new(InMemoryTimer::new());
        let sender = Arc::new(CountingSender {
            sends: AtomicUsize::new(0),
            should_fail,
        });
        let controller = LifecycleController::new(
            SchedulerCore::new(TASK, timer.clone()),
            Dispatcher::new(sender.clone(), Arc::new(StaticSite::new("Example Site"))),
        );
        (controller, timer, sender)
    }

    fn config(recipient: Option<&str>, frequency: FrequencyKind, custom_days: u32) -> TaskConfiguration {
        TaskConfiguration {
            recipient: recipient.map(String::from),
            frequency,
            custom_days,
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn configuration_change_rebuilds_schedule() {
        let (controller, timer, _) = wire(false);

        controller
            .on_activate(&config(Some("a@b.com"), FrequencyKind::Weekly, 3))
            .unwrap();
        assert_eq!(
            timer.record(TASK).unwrap().recurrence.interval_seconds,
            604_800
        );

        // Switching to every-5-days replaces the record outright.
        controller
            .on_configuration_changed(&config(Some("a@b.com"), FrequencyKind::CustomDays, 5))
            .unwrap();
        assert_eq!(
            timer.record(TASK).unwrap().recurrence.interval_seconds,
            432_000
        );
    }

    #[test]
    fn clearing_recipient_removes_schedule() {
        let (controller, timer, _) = wire(false);

        controller
            .on_activate(&config(Some("a@b.com"), FrequencyKind::Daily, 3))
            .unwrap();
        controller
            .on_configuration_changed(&config(None, FrequencyKind::Daily, 3))
            .unwrap();

        assert!(timer.record(TASK).is_none());
    }

    #[tokio::test]
    async fn manual_send_does_not_touch_schedule() {
        let (controller, timer, sender) = wire(false);
        let cfg = config(Some("a@b.com"), FrequencyKind::Weekly, 3);

        controller.on_activate(&cfg).unwrap();
        let before = timer.record(TASK).unwrap();

        controller.send_test_now(&cfg).await.unwrap();

        assert_eq!(sender.sends.load(Ordering::SeqCst), 1);
        assert_eq!(timer.record(TASK).unwrap(), before);
    }

    #[tokio::test]
    async fn manual_send_without_recipient_reports_precondition() {
        let (controller, _, sender) = wire(false);

        let err = controller
            .send_test_now(&config(None, FrequencyKind::Daily, 3))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MissingRecipient));
        assert_eq!(sender.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tick_dispatches_once_per_due_fire() {
        let (controller, _, sender) = wire(false);
        let cfg = config(Some("a@b.com"), FrequencyKind::Daily, 3);

        controller
            .scheduler()
            .install_at(&cfg, ts("2026-01-01T00:00:00Z"))
            .unwrap();

        // Not yet due.
        controller.on_tick_at(&cfg, ts("2026-01-01T12:00:00Z")).await;
        assert_eq!(sender.sends.load(Ordering::SeqCst), 0);

        // Due: exactly one send, then quiet until the next occurrence.
        let due = ts("2026-01-02T00:00:01Z");
        controller.on_tick_at(&cfg, due).await;
        controller.on_tick_at(&cfg, due).await;
        assert_eq!(sender.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tick_restores_externally_wiped_schedule() {
        let (controller, timer, _) = wire(false);
        let cfg = config(Some("a@b.com"), FrequencyKind::Weekly, 3);

        controller.on_activate(&cfg).unwrap();
        timer.clear(TASK).unwrap(); // host timer subsystem reset

        controller.on_tick(&cfg).await;

        let restored = timer.record(TASK).unwrap();
        assert_eq!(restored.recurrence.interval_seconds, 604_800);
    }

    #[tokio::test]
    async fn failed_scheduled_send_advances_schedule_anyway() {
        let (controller, timer, sender) = wire(true);
        let cfg = config(Some("a@b.com"), FrequencyKind::Daily, 3);

        controller
            .scheduler()
            .install_at(&cfg, ts("2026-01-01T00:00:00Z"))
            .unwrap();
        controller.on_tick_at(&cfg, ts("2026-01-02T00:00:01Z")).await;

        // One attempt, no retry; the schedule already points at the next fire.
        assert_eq!(sender.sends.load(Ordering::SeqCst), 1);
        assert_eq!(
            timer.record(TASK).unwrap().next_fire_at,
            ts("2026-01-03T00:00:00Z")
        );
    }

    #[test]
    fn deactivate_then_admin_view_without_recipient_stays_absent() {
        let (controller, timer, _) = wire(false);
        let cfg = config(Some("a@b.com"), FrequencyKind::Daily, 3);

        controller.on_activate(&cfg).unwrap();
        controller.on_deactivate().unwrap();
        controller.on_admin_view(&config(None, FrequencyKind::Daily, 3));

        assert!(timer.record(TASK).is_none());
    }
}
