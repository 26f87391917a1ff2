//! Handlers for `/members` endpoints.
//!
//! | Method   | Path | Operation |
//! |----------|------|-----------|
//! | `POST`   | `/members/register` | public |
//! | `GET`    | `/members` | `?payment_status=&membership_type=&search=` |
//! | `GET`    | `/members/stats` | totals per payment status |
//! | `GET`    | `/members/{id}` | 404 if not found |
//! | `PUT`    | `/members/{id}` | body: partial member |
//! | `PATCH`  | `/members/{id}/payment` | body: `{"payment_status":"confirmed"}` |
//! | `DELETE` | `/members/{id}` | hard delete |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  event::MemberEvent,
  lifecycle::{MemberStats, StatusTransition},
  member::{Member, MemberPatch, MembershipType, PaymentStatus, Registration},
  role::Operation,
  store::{MemberQuery, MemberStore},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{ApiState, auth::Caller, error::ApiError};

// ─── Register ────────────────────────────────────────────────────────────────

/// `POST /members/register`, public. The member number is not disclosed.
pub async fn register<S: MemberStore>(
  State(state): State<ApiState<S>>,
  body: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(registration) = body?;
  let input = registration.validate()?;

  let member = state
    .store
    .register(input)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(member_id = %member.member_id, category = ?member.category, "member registered");

  state.notifier.notify(MemberEvent::Registered(member.clone()));

  Ok((
    StatusCode::CREATED,
    Json(json!({
      "member_id": member.member_id,
      "message":   "registration received; payment pending verification",
    })),
  ))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(alias = "status")]
  pub payment_status:  Option<String>,
  #[serde(alias = "membershipType")]
  pub membership_type: Option<String>,
  pub search:          Option<String>,
}

impl ListParams {
  fn into_query(self) -> Result<MemberQuery, ApiError> {
    let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    Ok(MemberQuery {
      payment_status:  non_blank(self.payment_status)
        .map(|s| s.trim().parse::<PaymentStatus>())
        .transpose()?,
      membership_type: non_blank(self.membership_type)
        .map(|s| s.parse::<MembershipType>())
        .transpose()?,
      search:          non_blank(self.search),
    })
  }
}

/// `GET /members`
pub async fn list<S: MemberStore>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Member>>, ApiError> {
  caller.require(&state.policy, Operation::ListMembers)?;
  let Query(params) = params?;
  let query = params.into_query()?;

  let members = state
    .store
    .list_members(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(members))
}

/// `GET /members/stats`
pub async fn stats<S: MemberStore>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<MemberStats>, ApiError> {
  caller.require(&state.policy, Operation::ListMembers)?;
  let stats = state.store.stats().await.map_err(ApiError::from_store)?;
  Ok(Json(stats))
}

// ─── Single member ───────────────────────────────────────────────────────────

/// `GET /members/{id}`
pub async fn get_one<S: MemberStore>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
  caller.require(&state.policy, Operation::ViewMember)?;
  let member = state
    .store
    .get_member(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("member {id} not found")))?;
  Ok(Json(member))
}

/// `PUT /members/{id}`: partial update; immutable keys are ignored.
pub async fn update<S: MemberStore>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  body: Result<Json<MemberPatch>, JsonRejection>,
) -> Result<Json<Member>, ApiError> {
  caller.require(&state.policy, Operation::UpdateMember)?;
  let Json(patch) = body?;
  let changes = patch.validate()?;

  let update = state
    .store
    .update_member(id, changes)
    .await
    .map_err(ApiError::from_store)?;

  if let Some(allocation) = &update.renumbered {
    tracing::info!(
      member_id = %id,
      previous = ?update.previous_number,
      number = allocation.number(),
      degraded = allocation.is_degraded(),
      "member renumbered after category change"
    );
  }
  tracing::info!(member_id = %id, by = %caller.subject, "member updated");

  Ok(Json(update.member))
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
  #[serde(alias = "status", alias = "paymentStatus")]
  pub payment_status: Option<String>,
}

/// `PATCH /members/{id}/payment`
pub async fn set_payment<S: MemberStore>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  body: Result<Json<PaymentBody>, JsonRejection>,
) -> Result<Json<StatusTransition>, ApiError> {
  caller.require(&state.policy, Operation::SetPaymentStatus)?;
  let Json(body) = body?;
  let status = body
    .payment_status
    .ok_or_else(|| ApiError::Validation("payment_status is required".into()))?
    .parse::<PaymentStatus>()?;

  let transition = state
    .store
    .set_payment_status(id, status)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(
    member_id = %id,
    from = %transition.previous,
    to = %status,
    number = ?transition.member.member_number,
    by = %caller.subject,
    "payment status set"
  );

  if let Some(event) = MemberEvent::from_transition(&transition) {
    state.notifier.notify(event);
  }

  Ok(Json(transition))
}

/// `DELETE /members/{id}`
pub async fn delete<S: MemberStore>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  caller.require(&state.policy, Operation::DeleteMember)?;
  let removed = state
    .store
    .delete_member(id)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(
    member_id = %id,
    number = ?removed.member_number,
    by = %caller.subject,
    "member deleted"
  );
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_params_parse_and_skip_blanks() {
    let q = ListParams {
      payment_status:  Some("confirmed".into()),
      membership_type: Some("".into()),
      search:          Some("  ".into()),
    }
    .into_query()
    .unwrap();
    assert_eq!(q.payment_status, Some(PaymentStatus::Confirmed));
    assert_eq!(q.membership_type, None);
    assert_eq!(q.search, None);
  }

  #[test]
  fn unknown_status_filter_is_invalid_status() {
    let err = ListParams {
      payment_status: Some("paid".into()),
      ..Default::default()
    }
    .into_query()
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStatus(_)));
  }
}
