//! Profile lookup.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::PrincipalResponse;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentActor;

/// A mentor sees their clients, a client sees themself. Anything else is
/// indistinguishable from a missing profile.
///
/// GET /api/v1/profiles/:id
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<PrincipalResponse>, ApiError> {
    let profile = state
        .profiles
        .find_visible_profile(&actor, profile_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile.into()))
}
