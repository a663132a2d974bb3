//! Scheduler core: owns the single pending schedule record for the task.
//!
//! Guarantees that whenever a recipient is configured exactly one record
//! exists with a recurrence matching current configuration, and that the
//! record is rebuilt — never left stale — when configuration changes. The
//! core is the only writer of schedule state; the dispatcher never touches
//! it.
//!
//! Single-writer model: operations are synchronous and complete within one
//! invocation. A host that runs admin requests and timer polls in parallel
//! must serialize `install` / `teardown` / `ensure_integrity` per task name.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use mailbeat_core::TaskConfiguration;

use crate::error::SchedulerError;
use crate::interval::resolve_interval;
use crate::timer::{ScheduleRecord, TimerFacility};

/// Read model of the schedule for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ScheduleStatus {
    /// No recipient configured; the task is off.
    Disabled,
    /// A pending timer exists.
    Active {
        next_fire_at: DateTime<Utc>,
        label: String,
    },
    /// Recipient configured but the timer record is gone (external loss).
    /// Repaired by the next integrity check; surfaced as a warning, not an
    /// error.
    Missing,
}

/// Maintains the one pending "next fire" timer for a named task.
pub struct SchedulerCore {
    task_name: String,
    timer: Arc<dyn TimerFacility>,
}

impl SchedulerCore {
    pub fn new(task_name: impl Into<String>, timer: Arc<dyn TimerFacility>) -> Self {
        Self {
            task_name: task_name.into(),
            timer,
        }
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Rebuild the schedule from `config`.
    ///
    /// Clear-then-create as one logical unit: any prior record is removed,
    /// then a fresh one is installed iff a recipient is configured. The
    /// first fire lands one full interval from now — never immediately — so
    /// saving settings does not itself trigger an email. An invalid custom
    /// interval propagates and leaves the task absent.
    pub fn install(&self, config: &TaskConfiguration) -> Result<(), SchedulerError> {
        self.install_at(config, Utc::now())
    }

    /// [`install`](Self::install) with an explicit clock, for deterministic
    /// tests and replay.
    pub fn install_at(
        &self,
        config: &TaskConfiguration,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.timer.clear(&self.task_name)?;

        if config.recipient().is_none() {
            debug!(task = %self.task_name, "no recipient configured, schedule removed");
            return Ok(());
        }

        let recurrence = resolve_interval(config)?;
        let next_fire_at = now + Duration::seconds(recurrence.interval_seconds as i64);
        info!(
            task = %self.task_name,
            cadence = %recurrence.label,
            next_fire_at = %next_fire_at,
            "schedule installed"
        );
        self.timer.schedule(ScheduleRecord {
            task_name: self.task_name.clone(),
            next_fire_at,
            recurrence,
        })
    }

    /// Idempotent self-healing check, safe to run on every admin read or
    /// control-loop tick.
    ///
    /// Reinstalls the schedule only when a recipient is configured and the
    /// record has gone missing (host timer reset, manual deletion). A
    /// healthy record is never touched, so repeated calls observe no state
    /// change. Returns whether a repair happened.
    pub fn ensure_integrity(&self, config: &TaskConfiguration) -> Result<bool, SchedulerError> {
        if config.recipient().is_none() {
            return Ok(false);
        }
        if self.timer.record(&self.task_name).is_some() {
            return Ok(false);
        }
        warn!(task = %self.task_name, "schedule record missing, reinstalling");
        self.install(config)?;
        Ok(true)
    }

    /// Unconditionally remove the schedule. Used at deactivation; has no
    /// undo.
    pub fn teardown(&self) -> Result<(), SchedulerError> {
        info!(task = %self.task_name, "schedule torn down");
        self.timer.clear(&self.task_name)
    }

    /// If the timer has matured at `now`, claim the fire and advance the
    /// record to its next occurrence.
    pub fn take_due(&self, now: DateTime<Utc>) -> Result<Option<ScheduleRecord>, SchedulerError> {
        self.timer.take_due(&self.task_name, now)
    }

    /// Read-only schedule state for the admin surface.
    pub fn status(&self, config: &TaskConfiguration) -> ScheduleStatus {
        if config.recipient().is_none() {
            return ScheduleStatus::Disabled;
        }
        match self.timer.record(&self.task_name) {
            Some(record) => ScheduleStatus::Active {
                next_fire_at: record.next_fire_at,
                label: record.recurrence.label,
            },
            None => ScheduleStatus::Missing,
        }
    }
}
