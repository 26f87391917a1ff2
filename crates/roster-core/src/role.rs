//! Administrative roles and the capability table that gates operations.

use std::{
  collections::{HashMap, HashSet},
  fmt,
  str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The permission class of an authenticated administrative actor.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Full rights.
  Admin,
  /// Edits members and confirms payments.
  Registrar,
  /// Confirms payments.
  Treasurer,
  /// Content management; no access to the member registry.
  Communications,
}

impl Role {
  pub const ALL: [Role; 4] =
    [Self::Admin, Self::Registrar, Self::Treasurer, Self::Communications];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Registrar => "registrar",
      Self::Treasurer => "treasurer",
      Self::Communications => "communications",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|r| r.as_str() == s.trim().to_ascii_lowercase())
      .ok_or_else(|| Error::Validation(format!("unknown role: {s:?}")))
  }
}

/// A gated registry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  ListMembers,
  ViewMember,
  UpdateMember,
  SetPaymentStatus,
  DeleteMember,
  ViewSequences,
}

/// Role → allowed operations.
#[derive(Debug, Clone)]
pub struct RolePolicy {
  grants: HashMap<Role, HashSet<Operation>>,
}

impl Default for RolePolicy {
  fn default() -> Self {
    use Operation::*;

    let grants = HashMap::from([
      (Role::Admin, HashSet::from([
        ListMembers,
        ViewMember,
        UpdateMember,
        SetPaymentStatus,
        DeleteMember,
        ViewSequences,
      ])),
      (Role::Registrar, HashSet::from([
        ListMembers,
        ViewMember,
        UpdateMember,
        SetPaymentStatus,
      ])),
      (Role::Treasurer, HashSet::from([
        ListMembers,
        ViewMember,
        SetPaymentStatus,
      ])),
      (Role::Communications, HashSet::new()),
    ]);

    Self { grants }
  }
}

impl RolePolicy {
  /// Replace the set of roles allowed to change payment status. Admin
  /// always keeps the right.
  pub fn with_payment_roles(mut self, roles: &[Role]) -> Self {
    for (role, ops) in &mut self.grants {
      if *role == Role::Admin || roles.contains(role) {
        ops.insert(Operation::SetPaymentStatus);
      } else {
        ops.remove(&Operation::SetPaymentStatus);
      }
    }
    self
  }

  pub fn allows(&self, role: Role, op: Operation) -> bool {
    self.grants.get(&role).is_some_and(|ops| ops.contains(&op))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_table() {
    let p = RolePolicy::default();
    assert!(p.allows(Role::Admin, Operation::DeleteMember));
    assert!(!p.allows(Role::Registrar, Operation::DeleteMember));
    assert!(p.allows(Role::Registrar, Operation::UpdateMember));
    assert!(!p.allows(Role::Treasurer, Operation::UpdateMember));
    assert!(p.allows(Role::Treasurer, Operation::SetPaymentStatus));
    assert!(!p.allows(Role::Communications, Operation::ListMembers));
  }

  #[test]
  fn payment_roles_are_configurable() {
    let p = RolePolicy::default().with_payment_roles(&[Role::Treasurer]);
    assert!(p.allows(Role::Treasurer, Operation::SetPaymentStatus));
    assert!(!p.allows(Role::Registrar, Operation::SetPaymentStatus));
    assert!(p.allows(Role::Admin, Operation::SetPaymentStatus));
    assert!(p.allows(Role::Registrar, Operation::UpdateMember));
  }

  #[test]
  fn parses_role_names() {
    assert_eq!("Registrar".parse::<Role>().unwrap(), Role::Registrar);
    assert!("owner".parse::<Role>().is_err());
  }
}
