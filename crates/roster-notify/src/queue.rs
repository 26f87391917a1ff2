//! The in-process queue between committed writes and the mail transport.

use roster_core::event::MemberEvent;
use tokio::{
  sync::mpsc::{self, Receiver, Sender, error::TrySendError},
  task::JoinHandle,
};

use crate::{Mailer, Templates};

/// Producer half of the notification queue. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: Sender<MemberEvent>,
}

impl Notifier {
  /// A bounded queue holding at most `capacity` undelivered events.
  pub fn channel(capacity: usize) -> (Self, Receiver<MemberEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Self { tx }, rx)
  }

  /// Enqueue `event` without waiting. A full or closed queue drops the
  /// event with a warning; the return value says whether it was accepted.
  pub fn notify(&self, event: MemberEvent) -> bool {
    match self.tx.try_send(event) {
      Ok(()) => true,
      Err(TrySendError::Full(event)) => {
        tracing::warn!(
          event = event.name(),
          member_id = %event.member().member_id,
          "notification queue full, dropping event"
        );
        false
      }
      Err(TrySendError::Closed(event)) => {
        tracing::warn!(
          event = event.name(),
          member_id = %event.member().member_id,
          "notification queue closed, dropping event"
        );
        false
      }
    }
  }
}

/// Drain `rx` until every [`Notifier`] is dropped, rendering and sending
/// one message per event. Delivery failures are logged and skipped.
pub async fn dispatch<M: Mailer>(
  mut rx: Receiver<MemberEvent>,
  templates: Templates,
  mailer: M,
) {
  while let Some(event) = rx.recv().await {
    let message = templates.render(&event);
    let to = message.to.clone();
    match mailer.send(message).await {
      Ok(()) => tracing::debug!(event = event.name(), %to, "notification sent"),
      Err(e) => tracing::warn!(
        event = event.name(),
        %to,
        error = %e,
        "notification delivery failed"
      ),
    }
  }
  tracing::debug!("notification queue closed, dispatcher exiting");
}

/// Run [`dispatch`] on its own task.
pub fn spawn_dispatcher<M: Mailer>(
  rx: Receiver<MemberEvent>,
  templates: Templates,
  mailer: M,
) -> JoinHandle<()> {
  tokio::spawn(dispatch(rx, templates, mailer))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use roster_core::member::{Member, MemberKind, MembershipType, PaymentStatus};
  use uuid::Uuid;

  use super::*;
  use crate::{Error, MailMessage, RecordingMailer, Result};

  fn member(email: &str) -> Member {
    let now = Utc::now();
    Member {
      member_id:           Uuid::new_v4(),
      name:                "Brian".into(),
      email:               email.into(),
      phone:               "0700".into(),
      kind:                MemberKind::Student,
      category:            Some("ME".into()),
      registration_number: None,
      membership_type:     MembershipType::Pending,
      payment_reference:   "R1".into(),
      payment_status:      PaymentStatus::Pending,
      member_number:       None,
      registration_date:   now,
      last_updated:        now,
    }
  }

  fn templates() -> Templates { Templates::new("AECAS", "https://aecas.example") }

  #[tokio::test]
  async fn dispatcher_delivers_in_order_and_exits_when_senders_drop() {
    let (notifier, rx) = Notifier::channel(8);
    let mailer = RecordingMailer::new();
    let handle = spawn_dispatcher(rx, templates(), mailer.clone());

    assert!(notifier.notify(MemberEvent::Registered(member("a@x.io"))));
    assert!(notifier.notify(MemberEvent::PaymentRejected(member("b@x.io"))));
    drop(notifier);
    handle.await.unwrap();

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "a@x.io");
    assert!(sent[1].subject.contains("Payment Verification Issue"));
  }

  #[tokio::test]
  async fn full_queue_drops_without_blocking() {
    let (notifier, _rx) = Notifier::channel(1);
    assert!(notifier.notify(MemberEvent::Registered(member("a@x.io"))));
    assert!(!notifier.notify(MemberEvent::Registered(member("b@x.io"))));
  }

  #[tokio::test]
  async fn closed_queue_drops() {
    let (notifier, rx) = Notifier::channel(4);
    drop(rx);
    assert!(!notifier.notify(MemberEvent::Registered(member("a@x.io"))));
  }

  struct FailingMailer;

  impl Mailer for FailingMailer {
    async fn send(&self, _message: MailMessage) -> Result<()> {
      Err(Error::Transport("connection refused".into()))
    }
  }

  #[tokio::test]
  async fn delivery_failure_does_not_stop_the_dispatcher() {
    let (notifier, rx) = Notifier::channel(4);
    notifier.notify(MemberEvent::Registered(member("a@x.io")));
    notifier.notify(MemberEvent::Registered(member("b@x.io")));
    drop(notifier);

    // Returns only once both events have been attempted.
    dispatch(rx, templates(), FailingMailer).await;
  }
}
