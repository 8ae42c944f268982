//! Bearer token session resolution and role guards.
//!
//! `resolve_session` runs on every API route and records a
//! [`SessionState`] in the request extensions. The guards then apply the
//! route guard decision: missing session is 401, wrong role is 403.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::{Actor, Role};
use domain::services::{guard_route, GuardDecision, RequiredRole, SessionState};
use shared::jwt::{extract_principal_id, JwtConfig};

use crate::app::AppState;
use crate::error::ApiError;

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validates an access token and builds the actor it names.
pub fn actor_from_token(jwt: &JwtConfig, token: &str) -> Result<Actor, String> {
    let claims = jwt
        .validate_access_token(token)
        .map_err(|e| format!("Invalid token: {}", e))?;
    let id = extract_principal_id(&claims).map_err(|e| e.to_string())?;
    let role: Role = claims.role.parse()?;
    Ok(Actor { id, role })
}

/// Records the caller's session. A request without a token continues
/// unauthenticated; a request with a bad token is rejected here.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let session = match bearer_token(req.headers()) {
        None => SessionState::Unauthenticated,
        Some(token) => match actor_from_token(&state.jwt, token) {
            Ok(actor) => SessionState::Authenticated(actor),
            Err(e) => {
                tracing::debug!("Token rejected: {}", e);
                return ApiError::Unauthorized("Invalid or expired token".into()).into_response();
            }
        },
    };

    req.extensions_mut().insert(session);
    next.run(req).await
}

fn guard(req: Request<Body>, required: RequiredRole) -> Result<Request<Body>, ApiError> {
    let session = req
        .extensions()
        .get::<SessionState>()
        .copied()
        .unwrap_or(SessionState::Unauthenticated);

    match guard_route(&session, required) {
        GuardDecision::Render => Ok(req),
        GuardDecision::Redirect { to } => Err(ApiError::Forbidden(format!(
            "This resource is not available for your role (home: {})",
            to
        ))),
        // Sessions resolve before routing, so pending means no session.
        GuardDecision::RedirectToLogin | GuardDecision::Pending => {
            Err(ApiError::Unauthorized("Authentication required".into()))
        }
    }
}

pub async fn require_mentor(req: Request<Body>, next: Next) -> Response {
    match guard(req, RequiredRole::Mentor) {
        Ok(req) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

pub async fn require_authenticated(req: Request<Body>, next: Next) -> Response {
    match guard(req, RequiredRole::Any) {
        Ok(req) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use uuid::Uuid;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn request_with(session: Option<SessionState>) -> Request<Body> {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        if let Some(session) = session {
            req.extensions_mut().insert(session);
        }
        req
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_guard_without_session_is_unauthorized() {
        let err = guard(request_with(None), RequiredRole::Any).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_guard_wrong_role_is_forbidden() {
        let session = SessionState::Authenticated(Actor::client(Uuid::new_v4()));
        let err = guard(request_with(Some(session)), RequiredRole::Mentor).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_guard_matching_role_passes() {
        let session = SessionState::Authenticated(Actor::mentor(Uuid::new_v4()));
        assert!(guard(request_with(Some(session)), RequiredRole::Mentor).is_ok());
        assert!(guard(request_with(Some(session)), RequiredRole::Any).is_ok());
    }
}
