//! Invitation routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    CreateInvitationRequest, ListInvitationsQuery, ListInvitationsResponse, PrincipalResponse,
    RedeemInvitationRequest,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalActor;
use crate::services::{InvitationOutcome, InvitationResultBody};

/// 201 for a new record, 200 for a refreshed one, 502 when the email could
/// not be sent. The record exists in every case.
fn outcome_status(outcome: &InvitationOutcome) -> StatusCode {
    if !outcome.delivery.success() {
        StatusCode::BAD_GATEWAY
    } else if outcome.refreshed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

fn respond(state: &AppState, outcome: InvitationOutcome) -> (StatusCode, Json<InvitationResultBody>) {
    let expose = state.invitations.settings().expose_delivery_detail;
    (
        outcome_status(&outcome),
        Json(InvitationResultBody::from_outcome(&outcome, expose)),
    )
}

/// Invite a client, or refresh and resend the pending invitation for the
/// same address.
///
/// POST /api/v1/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    OptionalActor(actor): OptionalActor,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResultBody>), ApiError> {
    let outcome = state
        .invitations
        .create_or_refresh_and_send(actor.as_ref(), &request.client_email, &request.client_name)
        .await?;

    Ok(respond(&state, outcome))
}

/// POST /api/v1/invitations/:id/resend
pub async fn resend_invitation(
    State(state): State<AppState>,
    OptionalActor(actor): OptionalActor,
    Path(invitation_id): Path<Uuid>,
) -> Result<(StatusCode, Json<InvitationResultBody>), ApiError> {
    let outcome = state
        .invitations
        .resend_invitation(actor.as_ref(), invitation_id)
        .await?;

    Ok(respond(&state, outcome))
}

/// GET /api/v1/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    OptionalActor(actor): OptionalActor,
    Query(query): Query<ListInvitationsQuery>,
) -> Result<Json<ListInvitationsResponse>, ApiError> {
    let response = state
        .invitations
        .list_invitations(actor.as_ref(), &query)
        .await?;
    Ok(Json(response))
}

/// Register a client account with an invitation code.
///
/// POST /api/v1/invitations/redeem
pub async fn redeem_invitation(
    State(state): State<AppState>,
    Json(request): Json<RedeemInvitationRequest>,
) -> Result<(StatusCode, Json<PrincipalResponse>), ApiError> {
    let client = state.registration.redeem(request).await?;
    Ok((StatusCode::CREATED, Json(client.into())))
}
