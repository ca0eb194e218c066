use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

/// Outbound message handed to the mail transport.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

/// Mail transport seam. The SMTP implementation lives outside the core;
/// a send failure surfaces as an error the orchestrator maps to 500.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Development transport: logs the send and drops the message.
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email send (logging transport)"
        );
        Ok(())
    }
}

/// Transport that captures every message in memory so tests can pull
/// verification codes and reset links back out.
#[derive(Default)]
pub struct RecordingEmailSender {
    messages: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().clone()
    }

    pub fn last(&self) -> Option<EmailMessage> {
        self.messages.lock().last().cloned()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}
