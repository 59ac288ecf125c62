//! Instant loot handler.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use mystica_core::{LocationId, UserId};
use mystica_economy::InstantLootResult;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Instant loot request.
#[derive(Debug, Deserialize)]
pub struct InstantLootRequest {
    /// Location to loot.
    pub location_id: String,
}

/// Roll and grant loot for a location without a combat session.
pub async fn collect_instant_loot(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<InstantLootRequest>,
) -> Result<Json<InstantLootResult>, ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let location_id: LocationId = parse_id(&req.location_id, "location id")?;

    let result = state
        .loot
        .collect_instant_loot(&user_id, &location_id)
        .await?;

    Ok(Json(result))
}
