//! JSON REST API for the membership registry.
//!
//! Exposes an axum [`Router`] backed by any [`MemberStore`]. Registration is
//! public; every other route requires a bearer token whose role the
//! [`RolePolicy`] allows. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod members;
pub mod sequences;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use roster_core::{role::RolePolicy, store::MemberStore};
use roster_notify::Notifier;

pub use auth::{Caller, Claims, TokenKeys};
pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub tokens:   Arc<TokenKeys>,
  pub policy:   Arc<RolePolicy>,
  pub notifier: Notifier,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      tokens:   Arc::clone(&self.tokens),
      policy:   Arc::clone(&self.policy),
      notifier: self.notifier.clone(),
    }
  }
}

/// Build a fully-materialised API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: MemberStore + 'static,
{
  Router::new()
    .route("/members/register", post(members::register::<S>))
    .route("/members", get(members::list::<S>))
    .route("/members/stats", get(members::stats::<S>))
    .route(
      "/members/{id}",
      get(members::get_one::<S>)
        .put(members::update::<S>)
        .delete(members::delete::<S>),
    )
    .route("/members/{id}/payment", patch(members::set_payment::<S>))
    .route("/sequences", get(sequences::list::<S>))
    .with_state(state)
}
