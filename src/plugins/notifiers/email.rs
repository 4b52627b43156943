use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::extension::ClientId;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::Mutex;

use crate::config::{SmtpMailerConfig, SmtpSecurity};
use crate::plugins::traits::{AlertMessage, AlertTransport};
use crate::utils::error::{AppError, Result};

type Mailer = AsyncSmtpTransport<Tokio1Executor>;

/// SMTP alert transport. The connection is built lazily on the first send and dropped
/// on `close`; the mutex keeps concurrent callers from interleaving on it.
pub struct SmtpMailer {
    config: SmtpMailerConfig,
    transport: Mutex<Option<Mailer>>,
}

impl SmtpMailer {
    pub fn new(config: SmtpMailerConfig) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.transport.lock().await.is_some()
    }

    fn build_transport(&self) -> Result<Mailer> {
        let builder = match self.config.security {
            SmtpSecurity::Tls => Mailer::starttls_relay(&self.config.server)?,
            SmtpSecurity::Ssl => Mailer::relay(&self.config.server)?,
            SmtpSecurity::None => Mailer::builder_dangerous(&self.config.server),
        };

        let mut builder = builder.port(self.config.port);
        if !self.config.domain.is_empty() {
            builder = builder.hello_name(ClientId::Domain(self.config.domain.clone()));
        }
        if !self.config.login.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.login.clone(),
                self.config.password.clone(),
            ));
        }

        tracing::info!(
            "Opening SMTP transport to {}:{} ({:?})",
            self.config.server,
            self.config.port,
            self.config.security
        );
        Ok(builder.build())
    }
}

/// Converts an [`AlertMessage`] into a plain-text MIME message.
pub fn build_message(message: &AlertMessage) -> Result<Message> {
    let from = Mailbox::new(
        Some(message.from_name.clone()).filter(|n| !n.is_empty()),
        message.from_address.parse()?,
    );
    let to: Mailbox = message.to.parse()?;

    let email = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .header(header::ContentType::TEXT_PLAIN)
        .body(message.body.clone())?;
    Ok(email)
}

#[async_trait]
impl AlertTransport for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let email = build_message(message)?;

        let mut guard = self.transport.lock().await;
        if guard.is_none() {
            *guard = Some(self.build_transport()?);
        }
        let mailer = guard
            .as_ref()
            .ok_or_else(|| AppError::Internal("SMTP transport missing after open".to_string()))?;

        mailer.send(email).await?;
        Ok(())
    }

    async fn close(&self) {
        if self.transport.lock().await.take().is_some() {
            tracing::info!("Closed SMTP transport to {}", self.config.server);
        }
    }
}
