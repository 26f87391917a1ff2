//! Events emitted after registry writes commit.
//!
//! Consumers (the notification dispatcher) run in a separate failure domain:
//! nothing they do can roll back the write that produced the event.

use serde::{Deserialize, Serialize};

use crate::{
  lifecycle::StatusTransition,
  member::{Member, PaymentStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "member", rename_all = "snake_case")]
pub enum MemberEvent {
  Registered(Member),
  PaymentConfirmed(Member),
  PaymentRejected(Member),
}

impl MemberEvent {
  pub fn member(&self) -> &Member {
    match self {
      Self::Registered(m) | Self::PaymentConfirmed(m) | Self::PaymentRejected(m) => m,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Registered(_) => "registered",
      Self::PaymentConfirmed(_) => "payment_confirmed",
      Self::PaymentRejected(_) => "payment_rejected",
    }
  }

  /// The event a status transition announces, if any. Re-applying the
  /// current status, or moving back to pending, announces nothing.
  pub fn from_transition(transition: &StatusTransition) -> Option<Self> {
    if !transition.changed() {
      return None;
    }
    match transition.member.payment_status {
      PaymentStatus::Confirmed => {
        Some(Self::PaymentConfirmed(transition.member.clone()))
      }
      PaymentStatus::Rejected => {
        Some(Self::PaymentRejected(transition.member.clone()))
      }
      PaymentStatus::Pending => None,
    }
  }
}
