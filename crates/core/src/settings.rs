//! Key/value settings persistence.
//!
//! The scheduler and dispatcher never read settings directly; they receive a
//! [`TaskConfiguration`](crate::TaskConfiguration) value built from a store
//! once per invocation. The store itself is a narrow collaborator so the
//! admin surface (CLI today) can swap persistence without touching the core.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SettingsError;

/// Persisted settings keys.
pub const KEY_RECIPIENT: &str = "recipient";
pub const KEY_FREQUENCY: &str = "frequency";
pub const KEY_CUSTOM_DAYS: &str = "custom_days";

/// Narrow key/value settings collaborator.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

// ── In-memory store ───────────────────────────────────────────

/// Volatile store, used in tests and wiring experiments.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| SettingsError::Serialize(format!("lock poisoned: {e}")))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── JSON file store ───────────────────────────────────────────

/// Settings persisted as a flat JSON object on disk.
///
/// Every `set` rewrites the file; reads are served from the in-memory map
/// loaded at open time. Single-writer by assumption (see the concurrency
/// notes in the scheduler crate).
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileSettings {
    /// Open the store at `path`, loading existing values if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| SettingsError::Serialize(e.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(values)
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| SettingsError::Serialize(format!("lock poisoned: {e}")))?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }
}
