//! Maps a frequency configuration to a concrete repeat interval.
//!
//! Pure and deterministic: the same configuration always resolves to the
//! same [`RecurrenceSpec`]. All policy about *when* to (re)install lives in
//! [`SchedulerCore`](crate::SchedulerCore); this module only does the
//! arithmetic.

use serde::{Deserialize, Serialize};

use mailbeat_core::{FrequencyKind, TaskConfiguration};

use crate::error::SchedulerError;

/// Seconds in one day.
pub const DAY_SECONDS: u64 = 86_400;

/// A concrete repeat interval derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    /// Repeat interval in seconds. Always positive.
    pub interval_seconds: u64,
    /// Human-readable cadence ("daily", "every 3 days", ...), shown in
    /// scheduled email subjects and status output.
    pub label: String,
}

impl RecurrenceSpec {
    fn fixed(interval_seconds: u64, label: &str) -> Self {
        Self {
            interval_seconds,
            label: label.to_string(),
        }
    }
}

/// Resolve the repeat interval for a configuration.
///
/// "Monthly" is a fixed 30-day approximation, not calendar arithmetic; a
/// monthly schedule drifts relative to calendar months on purpose (kept from
/// the original behavior). Fails only for a custom interval below one day.
pub fn resolve_interval(config: &TaskConfiguration) -> Result<RecurrenceSpec, SchedulerError> {
    match config.frequency {
        FrequencyKind::Daily => Ok(RecurrenceSpec::fixed(DAY_SECONDS, "daily")),
        FrequencyKind::Weekly => Ok(RecurrenceSpec::fixed(7 * DAY_SECONDS, "weekly")),
        // 30-day approximation.
        FrequencyKind::Monthly => Ok(RecurrenceSpec::fixed(30 * DAY_SECONDS, "monthly")),
        FrequencyKind::CustomDays => {
            if config.custom_days < 1 {
                return Err(SchedulerError::InvalidCustomDays(config.custom_days));
            }
            Ok(RecurrenceSpec {
                interval_seconds: u64::from(config.custom_days) * DAY_SECONDS,
                label: format!("every {} days", config.custom_days),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(frequency: FrequencyKind, custom_days: u32) -> TaskConfiguration {
        TaskConfiguration {
            recipient: Some("ops@example.com".to_string()),
            frequency,
            custom_days,
        }
    }

    #[test]
    fn daily_is_one_day() {
        let spec = resolve_interval(&config(FrequencyKind::Daily, 3)).unwrap();
        assert_eq!(spec.interval_seconds, 86_400);
        assert_eq!(spec.label, "daily");
    }

    #[test]
    fn weekly_is_seven_days() {
        let spec = resolve_interval(&config(FrequencyKind::Weekly, 3)).unwrap();
        assert_eq!(spec.interval_seconds, 604_800);
        assert_eq!(spec.label, "weekly");
    }

    #[test]
    fn monthly_is_thirty_days() {
        let spec = resolve_interval(&config(FrequencyKind::Monthly, 3)).unwrap();
        assert_eq!(spec.interval_seconds, 2_592_000);
        assert_eq!(spec.label, "monthly");
    }

    #[test]
    fn custom_days_multiplies() {
        let spec = resolve_interval(&config(FrequencyKind::CustomDays, 3)).unwrap();
        assert_eq!(spec.interval_seconds, 259_200);
        assert_eq!(spec.label, "every 3 days");

        let spec = resolve_interval(&config(FrequencyKind::CustomDays, 5)).unwrap();
        assert_eq!(spec.interval_seconds, 432_000);
    }

    #[test]
    fn custom_days_zero_is_rejected() {
        let err = resolve_interval(&config(FrequencyKind::CustomDays, 0)).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCustomDays(0)));
    }

    #[test]
    fn custom_days_ignored_for_fixed_frequencies() {
        // A zero custom_days must not affect non-custom frequencies.
        let spec = resolve_interval(&config(FrequencyKind::Daily, 0)).unwrap();
        assert_eq!(spec.interval_seconds, 86_400);
    }

    #[test]
    fn resolution_is_deterministic() {
        let c = config(FrequencyKind::CustomDays, 7);
        assert_eq!(resolve_interval(&c).unwrap(), resolve_interval(&c).unwrap());
    }
}
