//! Scheduling core for the recurring test email.
//!
//! This crate provides:
//! - Interval resolution from a [`TaskConfiguration`](mailbeat_core::TaskConfiguration)
//!   to a concrete [`RecurrenceSpec`]
//! - The [`TimerFacility`] collaborator trait with in-memory and
//!   JSON-file-backed implementations
//! - [`SchedulerCore`], which owns the single pending schedule record:
//!   install on activation or config change, idempotent integrity repair
//!   when the record is lost externally, unconditional teardown

pub mod core;
pub mod error;
pub mod interval;
pub mod timer;

pub use crate::core::{ScheduleStatus, SchedulerCore};
pub use error::SchedulerError;
pub use interval::{resolve_interval, RecurrenceSpec, DAY_SECONDS};
pub use timer::{InMemoryTimer, JsonFileTimer, ScheduleRecord, TimerFacility};
