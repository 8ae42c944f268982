//! Invitation code entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::InvitationCode;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the invitation_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationCodeEntity {
    pub id: Uuid,
    pub code: String,
    pub mentor_id: Uuid,
    pub email: String,
    pub client_name: Option<String>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<InvitationCodeEntity> for InvitationCode {
    fn from(entity: InvitationCodeEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            mentor_id: entity.mentor_id,
            email: entity.email,
            client_name: entity.client_name,
            is_used: entity.is_used,
            used_at: entity.used_at,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
        }
    }
}
