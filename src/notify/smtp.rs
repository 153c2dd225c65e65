use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::SmtpConfig,
    error::{AppError, Result},
    notify::{Notifier, OutgoingEmail},
};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Email(format!("Invalid from address: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Email(format!("Failed to create SMTP transport: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .timeout(Some(Duration::from_secs(10)))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Email(format!("Invalid recipient {}: {}", email.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(email.text_body.clone()))
                    .singlepart(SinglePart::html(email.html_body.clone())),
            )
            .map_err(|e| AppError::Email(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(format!("SMTP delivery failed: {}", e)))?;

        Ok(())
    }
}
