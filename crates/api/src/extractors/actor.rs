//! Actor extractors.
//!
//! Read the [`SessionState`] recorded by the session middleware.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::Actor;
use domain::services::SessionState;

use crate::error::ApiError;

fn session_actor(parts: &Parts) -> Option<Actor> {
    match parts.extensions.get::<SessionState>() {
        Some(SessionState::Authenticated(actor)) => Some(*actor),
        _ => None,
    }
}

/// The authenticated caller. Rejects with 401 when there is none.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_actor(parts)
            .map(CurrentActor)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// The caller, if authenticated.
#[derive(Debug, Clone, Copy)]
pub struct OptionalActor(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalActor(session_actor(parts)))
    }
}
