//! E-mail adapter (lettre, SMTP).

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor,
};

use nrelay_core::{
    config::EmailConfig, domain::Channel, errors::Error, ports::ChannelSender, Result,
};

pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl EmailSender {
    pub fn new(cfg: &EmailConfig, timeout: Duration) -> Result<Self> {
        let from: Mailbox = cfg
            .from
            .parse()
            .map_err(|e| Error::Config(format!("SMTP_FROM: {e}")))?;

        let builder = match &cfg.smtp_url {
            Some(url) => AsyncSmtpTransport::<Tokio1Executor>::from_url(url)
                .map_err(|e| Error::Config(format!("SMTP_URL: {e}")))?,
            None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost"),
        };

        Ok(Self {
            transport: builder.timeout(Some(timeout)).build(),
            from,
            subject: cfg.subject.clone(),
        })
    }

    fn build_message(&self, recipient: &str, body: &str) -> Result<Message> {
        let to: Mailbox = recipient
            .trim()
            .parse()
            .map_err(|e| Error::Delivery(format!("invalid address {recipient}: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&self.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Delivery(format!("cannot build e-mail: {e}")))
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<()> {
        let mail = self.build_message(recipient, message)?;
        self.transport
            .send(mail)
            .await
            .map_err(|e| Error::Delivery(format!("smtp error: {e}")))?;
        Ok(())
    }
}
