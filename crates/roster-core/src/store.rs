//! The `MemberStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Higher layers (`roster-api`, `roster-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  lifecycle::{MemberStats, MemberUpdate, StatusTransition},
  member::{Member, MemberChanges, MembershipType, NewMember, PaymentStatus},
  number::NumberSequence,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`MemberStore::list_members`]. Predicates combine with AND.
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
  pub payment_status:  Option<PaymentStatus>,
  pub membership_type: Option<MembershipType>,
  /// Case-insensitive substring, OR-matched across name, email, phone,
  /// member number and category.
  pub search:          Option<String>,
}

// ─── Error contract ──────────────────────────────────────────────────────────

/// Backend errors must expose the domain error they carry, if any, so that
/// callers can tell a conflict or a missing member from an outage.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn as_core(&self) -> Option<&crate::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a member registry backend.
///
/// Writes that allocate member numbers must read the sequence, advance it,
/// and persist the member inside one serialisable transaction so that no two
/// members ever share a number.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait MemberStore: Send + Sync {
  type Error: StoreError;

  /// Persist a validated registration as a pending member without a number.
  ///
  /// Fails with [`crate::Error::DuplicateEmail`] if the email is taken.
  fn register(
    &self,
    input: NewMember,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  /// Retrieve a member by UUID. Returns `None` if not found.
  fn get_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  /// Members matching `query`, newest registration first.
  fn list_members<'a>(
    &'a self,
    query: &'a MemberQuery,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + 'a;

  /// Apply an administrator's edit. A category change on a confirmed member
  /// allocates a new number in the new sequence.
  fn update_member(
    &self,
    id: Uuid,
    changes: MemberChanges,
  ) -> impl Future<Output = Result<MemberUpdate, Self::Error>> + Send + '_;

  /// Move a member to `status`, allocating a number on first confirmation.
  fn set_payment_status(
    &self,
    id: Uuid,
    status: PaymentStatus,
  ) -> impl Future<Output = Result<StatusTransition, Self::Error>> + Send + '_;

  /// Hard-delete a member and return the removed record. Sequences are not
  /// rewound.
  fn delete_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  /// Totals per payment status.
  fn stats(
    &self,
  ) -> impl Future<Output = Result<MemberStats, Self::Error>> + Send + '_;

  /// All persisted number sequences, ordered by abbreviation.
  fn sequences(
    &self,
  ) -> impl Future<Output = Result<Vec<NumberSequence>, Self::Error>> + Send + '_;
}
