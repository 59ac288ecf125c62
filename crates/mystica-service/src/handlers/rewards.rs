//! Reward application handler.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use mystica_core::{AppliedRewards, ApplyOutcome, OperationId, RewardBundle, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Apply rewards request.
#[derive(Debug, Deserialize)]
pub struct ApplyRewardsRequest {
    /// Idempotency key chosen by the caller.
    pub operation_id: String,
    /// What to grant.
    pub bundle: RewardBundle,
    /// Level new items are created at (default: 1).
    #[serde(default = "default_context_level")]
    pub context_level: u32,
}

fn default_context_level() -> u32 {
    1
}

/// Apply a reward bundle.
///
/// Returns 201 when the bundle was granted and 200 when the operation id had
/// already been applied; the body is the recorded result either way.
pub async fn apply_rewards(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<ApplyRewardsRequest>,
) -> Result<(StatusCode, Json<AppliedRewards>), ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let operation_id: OperationId = parse_id(&req.operation_id, "operation id")?;

    let applied = state
        .rewards
        .apply_rewards(&user_id, operation_id, &req.bundle, req.context_level)?;

    let status = match applied.outcome {
        ApplyOutcome::Applied => StatusCode::CREATED,
        ApplyOutcome::AlreadyApplied => StatusCode::OK,
    };

    Ok((status, Json(applied)))
}
