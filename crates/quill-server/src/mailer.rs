//! Mailer implementations behind [`quill_api::Mailer`].

use async_trait::async_trait;
use lettre::{
  AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
  message::Mailbox, transport::smtp::authentication::Credentials,
};
use quill_api::otp::{MailError, Mailer};

use crate::config::SmtpConfig;

/// Delivers sign-in codes over SMTP with STARTTLS.
pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from:      Mailbox,
}

impl SmtpMailer {
  pub fn new(cfg: &SmtpConfig) -> Result<Self, MailError> {
    let transport =
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
        .port(cfg.port)
        .credentials(Credentials::new(
          cfg.username.clone(),
          cfg.password.clone(),
        ))
        .build();
    let from = cfg.from.parse::<Mailbox>()?;
    Ok(Self { transport, from })
  }
}

#[async_trait]
impl Mailer for SmtpMailer {
  async fn send_otp(&self, to: &str, code: &str) -> Result<(), MailError> {
    let message = Message::builder()
      .from(self.from.clone())
      .to(to.parse()?)
      .subject("Your sign-in code")
      .body(format!(
        "Your sign-in code is {code}. It expires in 5 minutes."
      ))?;
    self.transport.send(message).await?;
    Ok(())
  }
}

/// Used when no SMTP transport is configured: writes the code to the log.
/// Good enough for local development, useless in production on purpose.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send_otp(&self, to: &str, code: &str) -> Result<(), MailError> {
    tracing::info!(%to, %code, "smtp not configured, logging sign-in code");
    Ok(())
  }
}
