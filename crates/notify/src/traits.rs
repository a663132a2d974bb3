//! Mail sender trait, site metadata provider, and shared error types.

/// Errors that can occur during mail delivery.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Trait for the outbound mail collaborator.
///
/// One call is one delivery attempt; retry and timeout policy belong to the
/// implementation, not the caller. The body is HTML.
#[async_trait::async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver one HTML message to `to`.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;

    /// Human-readable name for this transport (e.g., "smtp").
    fn transport_name(&self) -> &str;
}

/// Provides display metadata about the installation, used in message
/// subjects.
pub trait SiteInfo: Send + Sync {
    fn site_name(&self) -> &str;
}

/// Fixed site metadata, configured at wiring time.
#[derive(Debug, Clone)]
pub struct StaticSite {
    name: String,
}

impl StaticSite {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Read the site name from `MAILBEAT_SITE_NAME`, defaulting to
    /// "mailbeat".
    pub fn from_env() -> Self {
        Self::new(mailbeat_core::config::env_or("MAILBEAT_SITE_NAME", "mailbeat"))
    }
}

impl SiteInfo for StaticSite {
    fn site_name(&self) -> &str {
        &self.name
    }
}
