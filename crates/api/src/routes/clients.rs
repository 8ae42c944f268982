//! Mentor client directory.

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue},
    Json,
};
use domain::models::PrincipalResponse;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentActor;

pub const SERVED_BY_HEADER: HeaderName = HeaderName::from_static("x-served-by");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListClientsResponse {
    pub clients: Vec<PrincipalResponse>,
    pub total: usize,
}

/// The calling mentor's clients. `X-Served-By` tells which listing strategy
/// answered.
///
/// GET /api/v1/clients
pub async fn list_clients(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<([(HeaderName, HeaderValue); 1], Json<ListClientsResponse>), ApiError> {
    let (clients, served_by) = state
        .client_directory
        .list_clients(actor.id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let clients: Vec<PrincipalResponse> = clients.into_iter().map(Into::into).collect();
    Ok((
        [(SERVED_BY_HEADER, HeaderValue::from_static(served_by.as_str()))],
        Json(ListClientsResponse {
            total: clients.len(),
            clients,
        }),
    ))
}
