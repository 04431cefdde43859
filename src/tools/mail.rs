//! Plain-text email through an SMTP relay
//!
//! One message per call, no retry. The relay is reached with STARTTLS and
//! the configured login unless `starttls` is switched off.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use super::error::ToolError;
use crate::config::MailConfig;

pub struct Mailer {
    config: MailConfig,
}

fn configured<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ToolError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ToolError::NotConfigured(name))
}

fn mailbox(address: &str) -> Result<Mailbox, ToolError> {
    address
        .trim()
        .parse()
        .map_err(|e| ToolError::validation(format!("Invalid email address {:?}: {}", address, e)))
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn sender(&self) -> Result<Mailbox, ToolError> {
        let address = match configured(&self.config.from, "Sender email address") {
            Ok(from) => from,
            Err(_) => configured(&self.config.username, "Sender email address")?,
        };
        mailbox(address)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, ToolError> {
        let relay = self.config.relay.trim();
        if relay.is_empty() {
            return Err(ToolError::NotConfigured("SMTP relay"));
        }

        let builder = if self.config.starttls {
            let username = configured(&self.config.username, "SMTP username")?;
            let password = configured(&self.config.password, "SMTP password")?;
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(relay)
                .map_err(|e| ToolError::Upstream(format!("SMTP relay {}: {}", relay, e)))?
                .credentials(Credentials::new(username.to_string(), password.to_string()))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(relay)
        };

        Ok(builder
            .port(self.config.port)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)))
            .build())
    }

    /// Send `body` to `to` with `subject`
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ToolError> {
        if to.trim().is_empty() {
            return Err(ToolError::validation("Please enter the receiver's email."));
        }
        let recipient = mailbox(to)?;

        let message = Message::builder()
            .from(self.sender()?)
            .to(recipient)
            .subject(subject.trim())
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ToolError::validation(format!("Could not build the email: {}", e)))?;

        self.transport()?.send(message).await.map_err(|e| {
            warn!("SMTP delivery via {} failed: {}", self.config.relay, e);
            ToolError::Upstream(format!("Failed to send email: {}", e))
        })?;

        info!("Email sent to {}", to.trim());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::smtp_relay;

    fn local_relay(port: u16) -> MailConfig {
        MailConfig {
            relay: "127.0.0.1".to_string(),
            port,
            starttls: false,
            from: Some("hub@example.com".to_string()),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_email_through_relay() {
        let (port, delivered) = smtp_relay().await;
        let mailer = Mailer::new(local_relay(port));

        mailer
            .send_email("ops@example.com", "Disk alert", "Disk is 95% full")
            .await
            .unwrap();

        let delivered = delivered.await.unwrap();
        assert!(delivered
            .envelope
            .iter()
            .any(|line| line.starts_with("MAIL FROM:<hub@example.com>")));
        assert!(delivered
            .envelope
            .iter()
            .any(|line| line.starts_with("RCPT TO:<ops@example.com>")));
        assert!(delivered.data.contains("Subject: Disk alert"));
        assert!(delivered.data.contains("Disk is 95% full"));
    }

    #[tokio::test]
    async fn test_recipient_validation() {
        let mailer = Mailer::new(local_relay(1));
        assert!(matches!(
            mailer.send_email("  ", "s", "b").await,
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(
            mailer.send_email("not an address", "s", "b").await,
            Err(ToolError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_starttls_requires_login() {
        let mailer = Mailer::new(MailConfig {
            from: Some("hub@example.com".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            mailer.send_email("ops@example.com", "s", "b").await,
            Err(ToolError::NotConfigured("SMTP username"))
        ));

        let mailer = Mailer::new(MailConfig::default());
        assert!(matches!(
            mailer.send_email("ops@example.com", "s", "b").await,
            Err(ToolError::NotConfigured("Sender email address"))
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_upstream() {
        let mailer = Mailer::new(local_relay(1));
        let err = mailer
            .send_email("ops@example.com", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
    }
}
