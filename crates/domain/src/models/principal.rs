//! Principals (mentors and clients) and the authenticated actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of a principal. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mentor => "mentor",
            Role::Client => "client",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mentor" => Ok(Role::Mentor),
            "client" => Ok(Role::Client),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered mentor or client profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    /// Inviting mentor, for clients. A relation, not ownership.
    pub mentor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn mentor(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Mentor,
        }
    }

    pub fn client(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Client,
        }
    }

    pub fn is_mentor(&self) -> bool {
        self.role == Role::Mentor
    }
}

impl From<&Principal> for Actor {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            role: principal.role,
        }
    }
}

/// Data needed to create a client account from a redeemed invitation.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub mentor_id: Uuid,
}

/// Public view of a principal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Principal> for PrincipalResponse {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            email: p.email,
            name: p.display_name,
            role: p.role,
            mentor_id: p.mentor_id,
            created_at: p.created_at,
        }
    }
}
