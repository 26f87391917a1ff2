//! HTTP server assembly for the membership registry.
//!
//! Turns a [`ServerConfig`] into the pieces the API needs (number format,
//! role policy, token keys, mail templates) and mounts the API under `/api`
//! next to a `/health` liveness route.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::get};
use roster_api::{ApiState, TokenKeys, api_router};
use roster_core::{
  number::{DEFAULT_ORG_PREFIX, NumberFormat},
  role::{Role, RolePolicy},
  store::MemberStore,
};
use roster_notify::{Notifier, Templates};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// HS256 secret for bearer tokens.
  pub jwt_secret:          String,
  #[serde(default = "default_org_prefix")]
  pub org_prefix:          String,
  /// Category → abbreviation entries added to the built-in course table.
  #[serde(default)]
  pub extra_abbreviations: BTreeMap<String, String>,
  /// Roles allowed to change payment status, besides admin.
  #[serde(default = "default_payment_roles")]
  pub payment_roles:       Vec<Role>,
  /// Site root used in email links.
  #[serde(default = "default_base_url")]
  pub base_url:            String,
  /// Capacity of the notification queue.
  #[serde(default = "default_notify_queue")]
  pub notify_queue:        usize,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/roster/roster.db") }
fn default_org_prefix() -> String { DEFAULT_ORG_PREFIX.into() }
fn default_payment_roles() -> Vec<Role> {
  vec![Role::Registrar, Role::Treasurer, Role::Admin]
}
fn default_base_url() -> String { "http://localhost:8080".into() }
fn default_notify_queue() -> usize { 256 }

impl ServerConfig {
  pub fn number_format(&self) -> NumberFormat {
    self
      .extra_abbreviations
      .iter()
      .fold(NumberFormat::new(&self.org_prefix), |format, (category, abbr)| {
        format.with_abbreviation(category, abbr.trim().to_uppercase())
      })
  }

  pub fn policy(&self) -> RolePolicy {
    RolePolicy::default().with_payment_roles(&self.payment_roles)
  }

  pub fn templates(&self) -> Templates {
    Templates::new(&self.org_prefix, &self.base_url)
  }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// Assemble API state from `config`, an opened `store` and the producer end
/// of the notification queue.
pub fn api_state<S>(config: &ServerConfig, store: S, notifier: Notifier) -> ApiState<S> {
  ApiState {
    store:  Arc::new(store),
    tokens: Arc::new(TokenKeys::new(&config.jwt_secret)),
    policy: Arc::new(config.policy()),
    notifier,
  }
}

/// The full application router.
pub fn app<S>(state: ApiState<S>) -> Router
where
  S: MemberStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
