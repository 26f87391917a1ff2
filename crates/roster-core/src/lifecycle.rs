//! The payment-status state machine and the records describing its effects.
//!
//! Stores call the planning functions inside their write transaction so the
//! decision and the resulting allocation commit together.

use serde::{Deserialize, Serialize};

use crate::{
  member::{Member, PaymentStatus},
  number::Allocation,
};

// ─── Planning ────────────────────────────────────────────────────────────────

/// Whether moving `member` to `to` must allocate a member number: only on a
/// transition into `confirmed`, only if no number is held yet, and only with
/// a category to number under.
pub fn needs_number(member: &Member, to: PaymentStatus) -> bool {
  to == PaymentStatus::Confirmed
    && member.member_number.is_none()
    && member.category.is_some()
}

/// Whether changing `member`'s category to `new_category` must allocate a
/// fresh number in the new sequence. Applies to confirmed members only; the
/// previous number is abandoned.
///
/// Categories are compared ignoring ASCII case and surrounding whitespace,
/// matching how they resolve to an abbreviation.
pub fn needs_renumber(member: &Member, new_category: Option<&str>) -> bool {
  member.payment_status == PaymentStatus::Confirmed
    && new_category.is_some_and(|new| {
      !member
        .category
        .as_deref()
        .is_some_and(|old| old.trim().eq_ignore_ascii_case(new.trim()))
    })
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// The result of [`crate::store::MemberStore::set_payment_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
  /// The member after the transition.
  pub member:     Member,
  pub previous:   PaymentStatus,
  /// Present when this transition assigned a number.
  pub allocation: Option<Allocation>,
}

impl StatusTransition {
  pub fn changed(&self) -> bool { self.previous != self.member.payment_status }
}

/// The result of [`crate::store::MemberStore::update_member`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberUpdate {
  pub member:          Member,
  /// Present when a category change re-numbered a confirmed member.
  pub renumbered:      Option<Allocation>,
  /// The abandoned number, when re-numbered.
  pub previous_number: Option<String>,
}

/// Registry totals per payment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
  pub total:     u64,
  pub pending:   u64,
  pub confirmed: u64,
  pub rejected:  u64,
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::member::{MemberKind, MembershipType};

  fn member(status: PaymentStatus, category: Option<&str>, number: Option<&str>) -> Member {
    let now = Utc::now();
    Member {
      member_id:           Uuid::new_v4(),
      name:                "Amina".into(),
      email:               "amina@example.com".into(),
      phone:               "0700000000".into(),
      kind:                MemberKind::Student,
      category:            category.map(Into::into),
      registration_number: None,
      membership_type:     MembershipType::Pending,
      payment_reference:   "REF".into(),
      payment_status:      status,
      member_number:       number.map(Into::into),
      registration_date:   now,
      last_updated:        now,
    }
  }

  #[test]
  fn confirmation_numbers_only_when_absent_and_categorised() {
    let fresh = member(PaymentStatus::Pending, Some("CE"), None);
    assert!(needs_number(&fresh, PaymentStatus::Confirmed));
    assert!(!needs_number(&fresh, PaymentStatus::Rejected));
    assert!(!needs_number(&fresh, PaymentStatus::Pending));

    let numbered = member(PaymentStatus::Confirmed, Some("CE"), Some("AECAS/CE/001"));
    assert!(!needs_number(&numbered, PaymentStatus::Confirmed));

    let uncategorised = member(PaymentStatus::Pending, None, None);
    assert!(!needs_number(&uncategorised, PaymentStatus::Confirmed));
  }

  #[test]
  fn renumber_only_on_real_change_when_confirmed() {
    let confirmed = member(PaymentStatus::Confirmed, Some("CE"), Some("AECAS/CE/001"));
    assert!(needs_renumber(&confirmed, Some("ME")));
    assert!(!needs_renumber(&confirmed, Some("CE")));
    assert!(!needs_renumber(&confirmed, Some("ce")));
    assert!(!needs_renumber(&confirmed, Some(" Ce ")));
    assert!(!needs_renumber(&confirmed, None));

    let pending = member(PaymentStatus::Pending, Some("CE"), None);
    assert!(!needs_renumber(&pending, Some("ME")));
  }
}
