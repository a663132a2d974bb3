use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::settings::{SettingsStore, KEY_CUSTOM_DAYS, KEY_FREQUENCY, KEY_RECIPIENT};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Read an env var, falling back to `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an env var, treating unset and empty the same.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Custom-days value used when the persisted setting is absent or unparseable.
pub const DEFAULT_CUSTOM_DAYS: u32 = 3;

// ── Frequency ─────────────────────────────────────────────────

/// How often the scheduled test email repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyKind {
    Daily,
    Weekly,
    Monthly,
    /// Repeat every `custom_days` days (value lives on [`TaskConfiguration`]).
    CustomDays,
}

impl FrequencyKind {
    /// Parse a persisted frequency string.
    ///
    /// Unknown or empty values fall back to [`FrequencyKind::Daily`] — the
    /// schedule degrades to a safe default rather than failing on a missing
    /// or mistyped setting.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "custom" | "custom_days" => Self::CustomDays,
            "daily" => Self::Daily,
            other => {
                if !other.is_empty() {
                    warn!(frequency = other, "unknown frequency, falling back to daily");
                }
                Self::Daily
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::CustomDays => "custom_days",
        }
    }
}

impl fmt::Display for FrequencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Task configuration ────────────────────────────────────────

/// Typed view of the three persisted settings driving the schedule.
///
/// Validation happens here, at the read/write boundary, so the scheduler and
/// dispatcher never see a malformed recipient or a non-numeric custom-days
/// value. A `custom_days` of 0 is preserved (not defaulted) so the interval
/// resolver can reject it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfiguration {
    /// Target address for the test email. `None` disables the task.
    pub recipient: Option<String>,
    pub frequency: FrequencyKind,
    pub custom_days: u32,
}

impl Default for TaskConfiguration {
    fn default() -> Self {
        Self {
            recipient: None,
            frequency: FrequencyKind::Daily,
            custom_days: DEFAULT_CUSTOM_DAYS,
        }
    }
}

impl TaskConfiguration {
    /// The configured recipient, trimmed, or `None` when the task is disabled.
    pub fn recipient(&self) -> Option<&str> {
        self.recipient
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Build a configuration from the settings store.
    ///
    /// Malformed values are sanitized here: an invalid recipient is treated
    /// as unset (task disabled), an unparseable custom-days falls back to
    /// [`DEFAULT_CUSTOM_DAYS`].
    pub fn from_store(store: &dyn SettingsStore) -> Self {
        let recipient = store.get(KEY_RECIPIENT).and_then(|raw| {
            let trimmed = raw.trim().to_string();
            if trimmed.is_empty() {
                None
            } else if is_valid_email(&trimmed) {
                Some(trimmed)
            } else {
                warn!(recipient = %trimmed, "ignoring invalid recipient address");
                None
            }
        });

        let frequency = store
            .get(KEY_FREQUENCY)
            .map(|s| FrequencyKind::parse(&s))
            .unwrap_or(FrequencyKind::Daily);

        let custom_days = store
            .get(KEY_CUSTOM_DAYS)
            .map(|s| match s.trim().parse::<u32>() {
                Ok(n) => n,
                Err(_) => {
                    warn!(custom_days = %s, "unparseable custom_days, using default");
                    DEFAULT_CUSTOM_DAYS
                }
            })
            .unwrap_or(DEFAULT_CUSTOM_DAYS);

        Self {
            recipient,
            frequency,
            custom_days,
        }
    }
}

/// Minimal structural email check applied at the settings boundary.
///
/// Full RFC validation belongs to the mail transport; this only rejects
/// values that cannot possibly be an address.
pub fn is_valid_email(s: &str) -> bool {
    let s = s.trim();
    if s.contains(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
