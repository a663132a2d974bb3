//! Timer facility: durable "next fire" state for named recurring tasks.
//!
//! The facility holds at most one [`ScheduleRecord`] per task name —
//! scheduling a task replaces any prior record for the same name. The
//! scheduler core is the only writer; readers may observe a transient
//! absence between a clear and the following schedule.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchedulerError;
use crate::interval::RecurrenceSpec;

/// The pending timer for one recurring task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub task_name: String,
    /// Absolute time of the next fire.
    pub next_fire_at: DateTime<Utc>,
    pub recurrence: RecurrenceSpec,
}

/// Narrow collaborator contract for the host's timer subsystem.
///
/// Reads are infallible (`None` covers both "no record" and an unreadable
/// backing store); mutations surface store errors.
pub trait TimerFacility: Send + Sync {
    /// Install a record, replacing any prior record for the same task name.
    fn schedule(&self, record: ScheduleRecord) -> Result<(), SchedulerError>;

    /// Remove the record for a task. Clearing an absent task is a no-op.
    fn clear(&self, task_name: &str) -> Result<(), SchedulerError>;

    /// The current record for a task, if any.
    fn record(&self, task_name: &str) -> Option<ScheduleRecord>;

    /// If the task's timer has matured at `now`, return the fired record and
    /// advance the pending record to the next future occurrence.
    ///
    /// Returns at most one fire per call; occurrences missed while the
    /// process was down collapse into that single fire (at-most-once-per-
    /// interval delivery, no catch-up storm after downtime).
    fn take_due(
        &self,
        task_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ScheduleRecord>, SchedulerError>;

    /// Convenience read for status displays.
    fn next_fire_time(&self, task_name: &str) -> Option<DateTime<Utc>> {
        self.record(task_name).map(|r| r.next_fire_at)
    }
}

/// Advance a due record past `now`, returning the fired snapshot.
fn fire_and_advance(record: &mut ScheduleRecord, now: DateTime<Utc>) -> Option<ScheduleRecord> {
    if record.next_fire_at > now {
        return None;
    }
    let fired = record.clone();
    // Interval is positive by construction; clamp anyway so a hand-edited
    // state file cannot wedge the loop.
    let step = Duration::seconds((record.recurrence.interval_seconds.max(1)) as i64);
    while record.next_fire_at <= now {
        record.next_fire_at += step;
    }
    debug!(
        task = %record.task_name,
        next_fire_at = %record.next_fire_at,
        "timer fired, advanced to next occurrence"
    );
    Some(fired)
}

// ── In-memory timer ───────────────────────────────────────────

/// Volatile timer state, used in tests and as the reference implementation.
#[derive(Debug, Default)]
pub struct InMemoryTimer {
    records: Mutex<HashMap<String, ScheduleRecord>>,
}

impl InMemoryTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerFacility for InMemoryTimer {
    fn schedule(&self, record: ScheduleRecord) -> Result<(), SchedulerError> {
        let mut records = lock(&self.records)?;
        records.insert(record.task_name.clone(), record);
        Ok(())
    }

    fn clear(&self, task_name: &str) -> Result<(), SchedulerError> {
        let mut records = lock(&self.records)?;
        records.remove(task_name);
        Ok(())
    }

    fn record(&self, task_name: &str) -> Option<ScheduleRecord> {
        self.records.lock().ok()?.get(task_name).cloned()
    }

    fn take_due(
        &self,
        task_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ScheduleRecord>, SchedulerError> {
        let mut records = lock(&self.records)?;
        Ok(records
            .get_mut(task_name)
            .and_then(|record| fire_and_advance(record, now)))
    }
}

// ── JSON file timer ───────────────────────────────────────────

/// Timer state persisted as a JSON file, surviving process restarts.
///
/// The file layout is owned by this implementation and opaque to the
/// scheduler core. Every mutation rewrites the file.
#[derive(Debug)]
pub struct JsonFileTimer {
    path: PathBuf,
    records: Mutex<HashMap<String, ScheduleRecord>>,
}

impl JsonFileTimer {
    /// Open the timer store at `path`, loading existing records if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SchedulerError> {
        let path = path.into();
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| SchedulerError::Store(e.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    fn persist(&self, records: &HashMap<String, ScheduleRecord>) -> Result<(), SchedulerError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(records)
            .map_err(|e| SchedulerError::Store(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TimerFacility for JsonFileTimer {
    fn schedule(&self, record: ScheduleRecord) -> Result<(), SchedulerError> {
        let mut records = lock(&self.records)?;
        records.insert(record.task_name.clone(), record);
        self.persist(&records)
    }

    fn clear(&self, task_name: &str) -> Result<(), SchedulerError> {
        let mut records = lock(&self.records)?;
        if records.remove(task_name).is_some() {
            self.persist(&records)?;
        }
        Ok(())
    }

    fn record(&self, task_name: &str) -> Option<ScheduleRecord> {
        self.records.lock().ok()?.get(task_name).cloned()
    }

    fn take_due(
        &self,
        task_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ScheduleRecord>, SchedulerError> {
        let mut records = lock(&self.records)?;
        let fired = records
            .get_mut(task_name)
            .and_then(|record| fire_and_advance(record, now));
        if fired.is_some() {
            self.persist(&records)?;
        }
        Ok(fired)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, SchedulerError> {
    mutex
        .lock()
        .map_err(|e| SchedulerError::Store(format!("lock poisoned: {e}")))
}
