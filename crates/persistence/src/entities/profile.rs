//! Profile entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Principal, Role};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the profiles table, without credentials.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub mentor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProfileEntity> for Principal {
    type Error = String;

    fn try_from(entity: ProfileEntity) -> Result<Self, Self::Error> {
        let role: Role = entity.role.parse()?;
        Ok(Self {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            role,
            mentor_id: entity.mentor_id,
            created_at: entity.created_at,
        })
    }
}
