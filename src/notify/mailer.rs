use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct MailError(String);

impl MailError {
    pub fn new(msg: impl Into<String>) -> Self {
        MailError(msg.into())
    }
}

/// Outbound mail collaborator. The dispatcher sends to every recipient
/// concurrently, so implementations must tolerate parallel calls.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Default mailer: records every send through tracing instead of talking to
/// a delivery vendor. Keeps development installs working without mail
/// credentials.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        tracing::info!(to = %to, subject = %subject, "mail send (log only)");
        Ok(())
    }
}
