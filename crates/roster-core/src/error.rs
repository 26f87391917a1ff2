//! Error types for `roster-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or malformed input; correctable by the caller.
  #[error("validation error: {0}")]
  Validation(String),

  #[error("a member with email {0:?} is already registered")]
  DuplicateEmail(String),

  #[error("invalid payment status: {0:?}")]
  InvalidStatus(String),

  #[error("member not found: {0}")]
  NotFound(Uuid),

  /// The allocator fell back to a time-derived number. Reported, never fatal.
  #[error("member number allocation degraded: {0}")]
  AllocationDegraded(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
