//! Repository for invitation code database operations.
//!
//! Uniqueness comes from the partial unique indexes on unused rows and
//! redemption from one conditional UPDATE, so concurrent requests are
//! serialized by PostgreSQL rather than by application checks.

use async_trait::async_trait;
use chrono::Utc;
use domain::models::{
    InvitationCode, InvitationStatus, InvitationSummary, NewInvitation, PendingInvitation,
    INVITATION_TTL_DAYS,
};
use domain::services::{InvitationStore, RedemptionDenial, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::InvitationCodeEntity;
use crate::metrics::QueryTimer;

const UNIQUE_VIOLATION: &str = "23505";
const UNUSED_MENTOR_EMAIL_INDEX: &str = "invitation_codes_unused_mentor_email_key";
const UNUSED_CODE_INDEX: &str = "invitation_codes_unused_code_key";

const COLUMNS: &str =
    "id, code, mentor_id, email, client_name, is_used, used_at, created_at, expires_at";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Maps a failed INSERT onto the store taxonomy by the violated index.
fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            match db_err.constraint() {
                Some(UNUSED_MENTOR_EMAIL_INDEX) => return StoreError::DuplicateEmail,
                Some(UNUSED_CODE_INDEX) => return StoreError::CodeCollision,
                _ => {}
            }
        }
    }
    backend(e)
}

fn status_clause(status: Option<InvitationStatus>) -> &'static str {
    match status {
        Some(InvitationStatus::Pending) => "AND is_used = false AND expires_at >= NOW()",
        Some(InvitationStatus::Used) => "AND is_used = true",
        Some(InvitationStatus::Expired) => "AND is_used = false AND expires_at < NOW()",
        None => "",
    }
}

/// Repository for invitation code operations.
#[derive(Clone)]
pub struct InvitationCodeRepository {
    pool: PgPool,
    ttl_days: i32,
}

impl InvitationCodeRepository {
    /// Creates a repository issuing invitations with the default lifetime.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ttl_days: INVITATION_TTL_DAYS as i32,
        }
    }

    pub fn with_ttl_days(mut self, ttl_days: i32) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Most relevant record for a code: the unused one if any, else the
    /// latest consumed one.
    async fn find_by_code(&self, code: &str) -> Result<Option<InvitationCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_invitation_by_code");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM invitation_codes
            WHERE code = $1
            ORDER BY is_used ASC, created_at DESC
            LIMIT 1
            "#
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait]
impl InvitationStore for InvitationCodeRepository {
    async fn find_active_invitation(
        &self,
        mentor_id: Uuid,
        email: &str,
    ) -> Result<Option<PendingInvitation>, StoreError> {
        let timer = QueryTimer::new("find_active_invitation");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM invitation_codes
            WHERE mentor_id = $1 AND lower(email) = lower($2) AND is_used = false
            "#
        ))
        .bind(mentor_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        let now = Utc::now();
        Ok(result
            .map_err(backend)?
            .map(|entity| PendingInvitation::from_unused(entity.into(), now)))
    }

    async fn create_invitation(&self, new: NewInvitation) -> Result<InvitationCode, StoreError> {
        let timer = QueryTimer::new("create_invitation");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(&format!(
            r#"
            INSERT INTO invitation_codes (code, mentor_id, email, client_name, expires_at)
            VALUES ($1, $2, $3, $4, NOW() + make_interval(days => $5))
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.code)
        .bind(new.mentor_id)
        .bind(&new.email)
        .bind(&new.client_name)
        .bind(self.ttl_days)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map(Into::into).map_err(map_insert_error)
    }

    async fn refresh_invitation(
        &self,
        id: Uuid,
        client_name: Option<&str>,
    ) -> Result<InvitationCode, StoreError> {
        let timer = QueryTimer::new("refresh_invitation");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(&format!(
            r#"
            UPDATE invitation_codes
            SET expires_at = NOW() + make_interval(days => $2),
                client_name = COALESCE($3, client_name),
                is_used = false
            WHERE id = $1 AND is_used = false
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(self.ttl_days)
        .bind(client_name)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        if let Some(entity) = result.map_err(backend)? {
            return Ok(entity.into());
        }

        // Nothing updated: either the row is gone or it was consumed.
        match self.find_by_id(id).await? {
            None => Err(StoreError::NotFound),
            Some(_) => Err(StoreError::InvalidState),
        }
    }

    async fn mark_used(&self, code: &str) -> Result<InvitationCode, StoreError> {
        let timer = QueryTimer::new("mark_invitation_used");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(&format!(
            r#"
            UPDATE invitation_codes
            SET is_used = true, used_at = NOW()
            WHERE code = $1 AND is_used = false AND expires_at >= NOW()
            RETURNING {COLUMNS}
            "#
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        if let Some(entity) = result.map_err(backend)? {
            return Ok(entity.into());
        }

        // Diagnostics only; the UPDATE above already decided the outcome.
        let record: Option<InvitationCode> =
            self.find_by_code(code).await.map_err(backend)?.map(Into::into);
        Err(StoreError::InvalidOrExpired(RedemptionDenial::diagnose(
            record.as_ref(),
        )))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InvitationCode>, StoreError> {
        let timer = QueryTimer::new("find_invitation_by_id");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(&format!(
            "SELECT {COLUMNS} FROM invitation_codes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(backend)?.map(Into::into))
    }

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InvitationCode>, StoreError> {
        let timer = QueryTimer::new("list_invitations_for_mentor");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM invitation_codes
            WHERE mentor_id = $1 {}
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            status_clause(status)
        ))
        .bind(mentor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result
            .map_err(backend)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn count_for_mentor(
        &self,
        mentor_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<i64, StoreError> {
        let timer = QueryTimer::new("count_invitations_for_mentor");
        let result = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM invitation_codes WHERE mentor_id = $1 {}",
            status_clause(status)
        ))
        .bind(mentor_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map_err(backend)
    }

    async fn summary_for_mentor(&self, mentor_id: Uuid) -> Result<InvitationSummary, StoreError> {
        let timer = QueryTimer::new("summarize_invitations_for_mentor");
        let result = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_used = false AND expires_at >= NOW()),
                COUNT(*) FILTER (WHERE is_used = true),
                COUNT(*) FILTER (WHERE is_used = false AND expires_at < NOW())
            FROM invitation_codes
            WHERE mentor_id = $1
            "#,
        )
        .bind(mentor_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        let (pending, used, expired) = result.map_err(backend)?;
        Ok(InvitationSummary {
            pending,
            used,
            expired,
        })
    }
}
