//! Shared types for the mailbeat workspace.
//!
//! This crate provides:
//! - `TaskConfiguration` and `FrequencyKind` — the typed view of the three
//!   persisted settings that drive the test-email schedule
//! - `SettingsStore` trait with in-memory and JSON-file implementations
//! - Environment helpers for config loading

pub mod config;
pub mod error;
pub mod settings;

pub use config::{FrequencyKind, TaskConfiguration, DEFAULT_CUSTOM_DAYS};
pub use error::SettingsError;
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
