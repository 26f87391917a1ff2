//! Outgoing mail and the transports that carry it.

use std::{future::Future, sync::Arc};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::Result;

/// A rendered email, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
  pub to:      String,
  pub subject: String,
  pub html:    String,
  /// Plain-text alternative of `html`.
  pub text:    String,
}

/// A mail transport. Implementations must not panic on delivery failure;
/// return [`crate::Error::Transport`] and the dispatcher logs it.
pub trait Mailer: Send + Sync + 'static {
  fn send(
    &self,
    message: MailMessage,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}

// ─── LogMailer ───────────────────────────────────────────────────────────────

/// Used when no transport is configured: logs the envelope and drops the
/// body.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
  async fn send(&self, message: MailMessage) -> Result<()> {
    tracing::info!(
      to = %message.to,
      subject = %message.subject,
      "mail transport not configured, skipping delivery"
    );
    Ok(())
  }
}

// ─── RecordingMailer ─────────────────────────────────────────────────────────

/// Keeps every message it is given. Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
  outbox: Arc<Mutex<Vec<MailMessage>>>,
}

impl RecordingMailer {
  pub fn new() -> Self { Self::default() }

  /// A snapshot of everything sent so far, oldest first.
  pub async fn sent(&self) -> Vec<MailMessage> {
    self.outbox.lock().await.clone()
  }
}

impl Mailer for RecordingMailer {
  async fn send(&self, message: MailMessage) -> Result<()> {
    self.outbox.lock().await.push(message);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn message(to: &str) -> MailMessage {
    MailMessage {
      to:      to.into(),
      subject: "Hi".into(),
      html:    "<p>Hi</p>".into(),
      text:    "Hi".into(),
    }
  }

  #[tokio::test]
  async fn recording_mailer_shares_outbox_across_clones() {
    let mailer = RecordingMailer::new();
    let clone = mailer.clone();

    mailer.send(message("a@x.io")).await.unwrap();
    clone.send(message("b@x.io")).await.unwrap();

    let sent = mailer.sent().await;
    let to: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
    assert_eq!(to, vec!["a@x.io", "b@x.io"]);
  }

  #[tokio::test]
  async fn log_mailer_always_succeeds() {
    assert!(LogMailer.send(message("a@x.io")).await.is_ok());
  }
}
