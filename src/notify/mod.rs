use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{Department, EmailPayload};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to build SMTP transport: {0}")]
    Transport(String),
    #[error("invalid sender address {0}: {1}")]
    SenderAddress(String, String),
}

/// Build the per-department notification batch for one upload. Departments
/// without a usable email address never produce a payload.
pub fn build_notifications(
    departments: &[Department],
    summary: &str,
    filename: &str,
) -> Vec<EmailPayload> {
    departments
        .iter()
        .filter_map(|dept| {
            let email = dept.email.as_deref()?.trim();
            if email.is_empty() {
                return None;
            }
            Some(EmailPayload {
                department: dept.name.clone(),
                summary: summary.to_string(),
                subject: format!("Notice Summary for {}: {}", dept.name, filename),
                to: email.to_string(),
            })
        })
        .collect()
}

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        let sender = config
            .smtp_user
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                MailError::SenderAddress(config.smtp_user.clone(), e.to_string())
            })?;

        Ok(Self { transport, sender })
    }

    /// Deliver one batch, best-effort. Each recipient is independent: failures
    /// are logged and the batch continues. Nothing is reported to the caller.
    pub async fn send_batch(&self, batch: &[EmailPayload]) {
        if batch.is_empty() {
            warn!("No emails to send");
            return;
        }

        for entry in batch {
            let recipient: Mailbox = match entry.to.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    error!("Invalid recipient address {}: {}", entry.to, e);
                    continue;
                }
            };

            let message = match Message::builder()
                .from(self.sender.clone())
                .to(recipient)
                .subject(entry.subject.clone())
                .body(entry.summary.clone())
            {
                Ok(message) => message,
                Err(e) => {
                    error!("Failed to compose email for {}: {}", entry.to, e);
                    continue;
                }
            };

            match self.transport.send(message).await {
                Ok(_) => info!("Email sent to {} ({})", entry.to, entry.department),
                Err(e) => error!("Failed to send email to {}: {}", entry.to, e),
            }
        }
    }
}
