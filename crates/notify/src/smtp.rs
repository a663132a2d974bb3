//! SMTP mail sender via `lettre` with TLS support.
//!
//! Supports STARTTLS and implicit TLS connections. The recipient is passed
//! per send, not fixed at construction, because the configured address can
//! change between fires.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use mailbeat_core::config::{env_opt, env_or};

use crate::traits::{MailError, MailSender};

/// SMTP connection settings, typically read from the environment.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,
    /// Optional port (defaults to 587; 465 always uses implicit TLS).
    pub port: Option<u16>,
    /// Whether to use TLS. `None` or `Some(true)` enables STARTTLS.
    pub tls: Option<bool>,
    /// Sender address (e.g. `"mailbeat@example.com"` or `"Mailbeat <mailbeat@example.com>"`).
    pub from: String,
}

impl SmtpConfig {
    /// Read SMTP settings from `SMTP_HOST`, `SMTP_PORT`, `SMTP_TLS`, and
    /// `SMTP_FROM`. Credentials are resolved separately at connect time from
    /// `SMTP_USERNAME` / `SMTP_PASSWORD`.
    pub fn from_env() -> Self {
        Self {
            host: env_or("SMTP_HOST", "localhost"),
            port: env_opt("SMTP_PORT").and_then(|v| v.parse().ok()),
            tls: env_opt("SMTP_TLS").map(|v| v != "false" && v != "0"),
            from: env_or("SMTP_FROM", "mailbeat@localhost"),
        }
    }
}

/// Sends test emails over SMTP.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from SMTP configuration.
    ///
    /// Port 465 uses implicit TLS; everything else uses STARTTLS when TLS is
    /// enabled. SMTP credentials come from the `SMTP_USERNAME` and
    /// `SMTP_PASSWORD` environment variables when both are set; otherwise
    /// the connection is unauthenticated.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Config(e.to_string()))?;

        let port = config.port.unwrap_or(587);
        let use_tls = config.tls.unwrap_or(true);

        let mut builder = if port == 465 || use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(port)
        };

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait::async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::info!(
            transport = "smtp",
            to = %to.email,
            subject = %subject,
            "test email delivered"
        );

        Ok(())
    }

    fn transport_name(&self) -> &str {
        "smtp"
    }
}
