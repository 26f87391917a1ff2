//! Bearer-token authentication and role checks.
//!
//! Tokens are HS256 JWTs carrying the caller's [`Role`]. There is no login
//! endpoint; operators mint tokens out of band with [`TokenKeys::issue`].

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use roster_core::{
  role::{Operation, Role, RolePolicy},
  store::MemberStore,
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, error::ApiError};

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub:  String,
  pub role: Role,
  pub iat:  i64,
  pub exp:  i64,
}

/// Signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct TokenKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
}

impl TokenKeys {
  pub fn new(secret: &str) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
    }
  }

  /// Mint a token for `subject` acting as `role`, valid for `ttl`.
  pub fn issue(
    &self,
    subject: &str,
    role: Role,
    ttl: Duration,
  ) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
      sub: subject.to_owned(),
      role,
      iat: now.timestamp(),
      exp: (now + ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &self.encoding)
  }

  /// Check signature and expiry, returning the claims.
  pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(token, &self.decoding, &Validation::default())
      .map(|data| data.claims)
  }
}

/// An authenticated administrative caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
  pub subject: String,
  pub role:    Role,
}

impl Caller {
  /// `Forbidden` unless `policy` grants `op` to this caller's role.
  pub fn require(&self, policy: &RolePolicy, op: Operation) -> Result<(), ApiError> {
    if policy.allows(self.role, op) {
      Ok(())
    } else {
      tracing::debug!(subject = %self.subject, role = %self.role, ?op, "operation denied");
      Err(ApiError::Forbidden)
    }
  }
}

/// Verify the bearer token in `headers`.
pub fn verify_bearer(headers: &HeaderMap, keys: &TokenKeys) -> Result<Caller, ApiError> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(ApiError::Unauthorized)?;

  let claims = keys.verify(token).map_err(|e| {
    tracing::debug!(error = %e, "rejected bearer token");
    ApiError::Unauthorized
  })?;

  Ok(Caller { subject: claims.sub, role: claims.role })
}

impl<S> FromRequestParts<ApiState<S>> for Caller
where
  S: MemberStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_bearer(&parts.headers, &state.tokens)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
  }

  #[test]
  fn issued_token_round_trips() {
    let keys = TokenKeys::new("s3cret");
    let token = keys.issue("ops@aecas", Role::Treasurer, Duration::hours(1)).unwrap();

    let claims = keys.verify(&token).unwrap();
    assert_eq!(claims.sub, "ops@aecas");
    assert_eq!(claims.role, Role::Treasurer);
    assert_eq!(claims.exp - claims.iat, 3600);

    let caller = verify_bearer(&bearer(&token), &keys).unwrap();
    assert_eq!(caller, Caller { subject: "ops@aecas".into(), role: Role::Treasurer });
  }

  #[test]
  fn wrong_secret_is_unauthorized() {
    let token = TokenKeys::new("one")
      .issue("x", Role::Admin, Duration::hours(1))
      .unwrap();
    let result = verify_bearer(&bearer(&token), &TokenKeys::new("two"));
    assert!(matches!(result, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn expired_token_is_unauthorized() {
    let keys = TokenKeys::new("s3cret");
    let token = keys.issue("x", Role::Admin, Duration::hours(-2)).unwrap();
    assert!(matches!(verify_bearer(&bearer(&token), &keys), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn missing_or_malformed_header_is_unauthorized() {
    let keys = TokenKeys::new("s3cret");
    assert!(matches!(verify_bearer(&HeaderMap::new(), &keys), Err(ApiError::Unauthorized)));

    let mut basic = HeaderMap::new();
    basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    assert!(matches!(verify_bearer(&basic, &keys), Err(ApiError::Unauthorized)));

    assert!(matches!(verify_bearer(&bearer("garbage"), &keys), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn require_consults_policy() {
    let policy = RolePolicy::default();
    let treasurer = Caller { subject: "t".into(), role: Role::Treasurer };
    assert!(treasurer.require(&policy, Operation::SetPaymentStatus).is_ok());
    assert!(matches!(
      treasurer.require(&policy, Operation::DeleteMember),
      Err(ApiError::Forbidden)
    ));
  }
}
