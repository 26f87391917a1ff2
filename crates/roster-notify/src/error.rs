//! Error type for `roster-notify`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The mail transport refused or failed to take the message.
  #[error("mail transport error: {0}")]
  Transport(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
