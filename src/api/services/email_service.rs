//! Outgoing account email (verification and password reset).
//!
//! With an empty SMTP host the service runs in log-only mode, which is what
//! development and the test suite use.

use anyhow::Context;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SmtpSettings;

#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    public_base_url: String,
}

impl EmailService {
    pub fn new(settings: &SmtpSettings, public_base_url: &str) -> Result<Self, String> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| format!("Invalid SMTP_FROM address: {}", e))?;

        let transport = if settings.host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| format!("Failed to configure SMTP transport: {}", e))?
                .port(settings.port);
            let builder = match (&settings.username, &settings.password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };
            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email/{}/", self.public_base_url, token)
    }

    pub fn password_reset_link(&self, token: &str) -> String {
        format!("{}/reset-password/{}/", self.public_base_url, token)
    }

    pub async fn send_verification_email(&self, recipient: &str, token: &str) -> anyhow::Result<()> {
        let body = format!(
            "Hello!\n\nPlease confirm your email address by following the link:\n{}\n\n\
             The link is valid for 24 hours. If you did not sign up, ignore this email.",
            self.verification_link(token)
        );
        self.send_mail(recipient, "Confirm your email address", &body)
            .await
    }

    pub async fn send_password_reset_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        let body = format!(
            "Hello!\n\nYou requested a password reset.\n\
             Follow the link to set a new password:\n{}\n\n\
             The link expires in 1 hour. If you did not request this, ignore this email.",
            self.password_reset_link(token)
        );
        self.send_mail(recipient, "Password reset", &body).await
    }

    async fn send_mail(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let Some(transport) = &self.transport else {
            info!(recipient, subject, "Email service disabled; skipping send");
            return Ok(());
        };

        let to = recipient
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid recipient address: {}", recipient))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build email")?;

        transport
            .send(message)
            .await
            .context("Failed to send email")?;
        info!(recipient, subject, "Email sent");
        Ok(())
    }
}
