//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use roster_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  InvalidStatus(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  NotFound(String),

  #[error("authentication required")]
  Unauthorized,

  #[error("insufficient permissions")]
  Forbidden,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Surface the domain error a backend carries; anything else is an outage.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    let domain = e
      .as_core()
      .filter(|core| !matches!(core, roster_core::Error::Serialization(_)))
      .map(Self::from_core);
    domain.unwrap_or_else(|| Self::Store(Box::new(e)))
  }

  fn from_core(e: &roster_core::Error) -> Self {
    use roster_core::Error as E;
    match e {
      E::Validation(m) => Self::Validation(m.clone()),
      E::InvalidStatus(_) => Self::InvalidStatus(e.to_string()),
      E::DuplicateEmail(_) => Self::Conflict(e.to_string()),
      E::NotFound(id) => Self::NotFound(format!("member {id} not found")),
      E::AllocationDegraded(_) | E::Serialization(_) => {
        Self::Store(e.to_string().into())
      }
    }
  }
}

impl From<roster_core::Error> for ApiError {
  fn from(e: roster_core::Error) -> Self { Self::from_core(&e) }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { Self::Validation(e.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(e: QueryRejection) -> Self { Self::Validation(e.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Validation(m) | ApiError::InvalidStatus(m) => {
        (StatusCode::BAD_REQUEST, m.clone())
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  fn status(e: ApiError) -> StatusCode { e.into_response().status() }

  #[test]
  fn domain_errors_map_to_statuses() {
    use roster_core::Error as E;
    assert_eq!(status(E::validation("name is required").into()), StatusCode::BAD_REQUEST);
    assert_eq!(status(E::InvalidStatus("paid".into()).into()), StatusCode::BAD_REQUEST);
    assert_eq!(status(E::DuplicateEmail("a@x.io".into()).into()), StatusCode::CONFLICT);
    assert_eq!(status(E::NotFound(Uuid::new_v4()).into()), StatusCode::NOT_FOUND);
    assert_eq!(status(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
    assert_eq!(status(ApiError::Forbidden), StatusCode::FORBIDDEN);
  }

  #[derive(Debug, Error)]
  enum FakeStoreError {
    #[error(transparent)]
    Core(roster_core::Error),
    #[error("disk on fire")]
    Disk,
  }

  impl StoreError for FakeStoreError {
    fn as_core(&self) -> Option<&roster_core::Error> {
      match self {
        Self::Core(e) => Some(e),
        Self::Disk => None,
      }
    }
  }

  #[test]
  fn store_errors_split_domain_from_outage() {
    let conflict = ApiError::from_store(FakeStoreError::Core(
      roster_core::Error::DuplicateEmail("a@x.io".into()),
    ));
    assert!(matches!(conflict, ApiError::Conflict(_)));

    let outage = ApiError::from_store(FakeStoreError::Disk);
    assert!(matches!(outage, ApiError::Store(_)));
    assert_eq!(status(outage), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
