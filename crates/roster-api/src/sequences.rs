//! `GET /sequences`: the persisted member-number counters.

use axum::{Json, extract::State};
use roster_core::{number::NumberSequence, role::Operation, store::MemberStore};

use crate::{ApiState, auth::Caller, error::ApiError};

pub async fn list<S: MemberStore>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<Vec<NumberSequence>>, ApiError> {
  caller.require(&state.policy, Operation::ViewSequences)?;
  let sequences = state
    .store
    .sequences()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(sequences))
}
