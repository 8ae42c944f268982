//! Role and ownership checks.
//!
//! These are plain functions over plain data so the same rule can gate
//! routes here, drive UI redirects, and be compared against the SQL
//! policies in `persistence`. The storage layer remains the authoritative
//! enforcement.

use crate::models::{Actor, Role};
use uuid::Uuid;

/// Login entry point for unauthenticated sessions.
pub const LOGIN_ROUTE: &str = "/login";

/// Role a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    Any,
    Mentor,
    Client,
}

/// Ownership facts about a profile being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceOwner {
    /// The profile's own id.
    pub owner_id: Uuid,
    /// Mentor who invited the profile, for clients.
    pub mentor_id: Option<Uuid>,
}

impl ResourceOwner {
    pub fn new(owner_id: Uuid, mentor_id: Option<Uuid>) -> Self {
        Self {
            owner_id,
            mentor_id,
        }
    }
}

/// Role gate, then (if a resource is given) the ownership gate.
pub fn can_access(actor: &Actor, required: RequiredRole, resource: Option<&ResourceOwner>) -> bool {
    let role_ok = match required {
        RequiredRole::Any => true,
        RequiredRole::Mentor => actor.role == Role::Mentor,
        RequiredRole::Client => actor.role == Role::Client,
    };
    if !role_ok {
        return false;
    }

    resource.map_or(true, |r| can_view_profile(actor, r))
}

/// A mentor sees the clients they invited; a client sees only themself.
/// Mentor records have no `mentor_id`, so no actor sees them here.
pub fn can_view_profile(actor: &Actor, profile: &ResourceOwner) -> bool {
    match actor.role {
        Role::Mentor => profile.mentor_id == Some(actor.id),
        Role::Client => profile.owner_id == actor.id,
    }
}

/// Landing page for each role.
pub fn home_route(role: Role) -> &'static str {
    match role {
        Role::Mentor => "/mentor/dashboard",
        Role::Client => "/client/assessments",
    }
}

/// What the caller knows about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Unauthenticated,
    Authenticated(Actor),
}

/// What a guarded route should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved yet. Render nothing.
    Pending,
    RedirectToLogin,
    /// Authenticated but the wrong role for this route.
    Redirect { to: &'static str },
    Render,
}

/// Decides a route's fate. Protected content is only rendered for an
/// authenticated actor with the required role.
pub fn guard_route(state: &SessionState, required: RequiredRole) -> GuardDecision {
    match state {
        SessionState::Loading => GuardDecision::Pending,
        SessionState::Unauthenticated => GuardDecision::RedirectToLogin,
        SessionState::Authenticated(actor) => {
            if can_access(actor, required, None) {
                GuardDecision::Render
            } else {
                GuardDecision::Redirect {
                    to: home_route(actor.role),
                }
            }
        }
    }
}
