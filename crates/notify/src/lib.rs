//! Test-email dispatch for mailbeat.
//!
//! This crate provides:
//! - `MailSender` trait for the outbound mail collaborator
//! - SMTP implementation via `lettre` with TLS support
//! - `Dispatcher` that composes the test message for a trigger reason and
//!   performs exactly one send attempt, never touching schedule state

pub mod dispatcher;
pub mod smtp;
pub mod traits;

pub use dispatcher::{DispatchError, DispatchReason, Dispatcher};
pub use smtp::{SmtpConfig, SmtpMailer};
pub use traits::{MailError, MailSender, SiteInfo, StaticSite};
