//! Outbound email.
//!
//! Delivery is behind [`Mailer`]. The default [`LogMailer`] records that a
//! message was due, without its body; [`MemoryMailer`] keeps an outbox for
//! tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
#[error("email delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Logs recipient and subject only. Bodies carry verification links and
/// never reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl LogMailer {
    fn record(&self, message: &EmailMessage) {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "email not delivered (no transport configured)"
        );
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.record(&message);
        Ok(())
    }
}

/// Collects sent messages. Clones share the outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.outbox.lock().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn log_mailer_omits_message_body() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let message = EmailMessage {
            to: "a@example.com".into(),
            subject: "Email Verification".into(),
            body: "link: http://host/api/v2/verify-email?token=secret-token".into(),
        };
        tracing::subscriber::with_default(subscriber, || LogMailer.record(&message));

        let logged = String::from_utf8(capture.0.lock().clone()).unwrap();
        assert!(logged.contains("a@example.com"));
        assert!(logged.contains("Email Verification"));
        assert!(!logged.contains("secret-token"));
    }

    #[tokio::test]
    async fn memory_mailer_clones_share_outbox() {
        let mailer = MemoryMailer::new();
        let handle = mailer.clone();
        mailer
            .send(EmailMessage {
                to: "b@example.com".into(),
                subject: "s".into(),
                body: "b".into(),
            })
            .await
            .unwrap();
        assert_eq!(handle.sent().len(), 1);
    }
}
