//! Error type for `roster-store-sqlite`.

use roster_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types do not recognise.
  #[error("cannot decode column {column}: {value:?}")]
  Decode { column: &'static str, value: String },
}

impl Error {
  /// True for infrastructure failures, as opposed to domain rejections.
  pub fn is_storage(&self) -> bool { !matches!(self, Self::Core(_)) }
}

impl StoreError for Error {
  fn as_core(&self) -> Option<&roster_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
