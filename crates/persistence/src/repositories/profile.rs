//! Repository for mentor and client profiles.

use async_trait::async_trait;
use domain::models::{Actor, NewClient, Principal};
use domain::services::{
    ClientDirectory, FallbackClientDirectory, PrincipalStore, PrincipalStoreError,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ProfileEntity;
use crate::metrics::QueryTimer;

const UNIQUE_VIOLATION: &str = "23505";

fn backend(e: sqlx::Error) -> PrincipalStoreError {
    PrincipalStoreError::Backend(e.to_string())
}

fn into_principal(entity: ProfileEntity) -> Result<Principal, PrincipalStoreError> {
    Principal::try_from(entity).map_err(PrincipalStoreError::Backend)
}

fn into_principals(entities: Vec<ProfileEntity>) -> Result<Vec<Principal>, PrincipalStoreError> {
    entities.into_iter().map(into_principal).collect()
}

/// Repository for profile operations.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers a mentor. Mentor sign-up lives with the identity
    /// provider; this backs provisioning and tests.
    pub async fn create_mentor(
        &self,
        email: &str,
        display_name: &str,
    ) -> Result<Principal, PrincipalStoreError> {
        let timer = QueryTimer::new("create_mentor_profile");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            INSERT INTO profiles (email, display_name, role)
            VALUES (lower($1), $2, 'mentor')
            RETURNING id, email, display_name, role, mentor_id, created_at
            "#,
        )
        .bind(email)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        into_principal(result.map_err(map_insert_error)?)
    }
}

fn map_insert_error(e: sqlx::Error) -> PrincipalStoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return PrincipalStoreError::DuplicateEmail;
        }
    }
    backend(e)
}

#[async_trait]
impl PrincipalStore for ProfileRepository {
    async fn email_exists(&self, email: &str) -> Result<bool, PrincipalStoreError> {
        let timer = QueryTimer::new("profile_email_exists");
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE lower(email) = lower($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map_err(backend)
    }

    async fn create_client(&self, new: NewClient) -> Result<Principal, PrincipalStoreError> {
        let timer = QueryTimer::new("create_client_profile");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            INSERT INTO profiles (email, display_name, role, mentor_id, password_hash)
            VALUES (lower($1), $2, 'client', $3, $4)
            RETURNING id, email, display_name, role, mentor_id, created_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.display_name)
        .bind(new.mentor_id)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        into_principal(result.map_err(map_insert_error)?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, PrincipalStoreError> {
        let timer = QueryTimer::new("find_profile_by_id");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT id, email, display_name, role, mentor_id, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result.map_err(backend)?.map(into_principal).transpose()
    }

    async fn find_visible_profile(
        &self,
        actor: &Actor,
        profile_id: Uuid,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        // Same rule as `can_view_profile`, evaluated by the database.
        let timer = QueryTimer::new("find_visible_profile");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT id, email, display_name, role, mentor_id, created_at
            FROM profiles
            WHERE id = $1
              AND (
                    ($3 = 'mentor' AND mentor_id = $2)
                 OR ($3 = 'client' AND id = $2)
              )
            "#,
        )
        .bind(profile_id)
        .bind(actor.id)
        .bind(actor.role.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result.map_err(backend)?.map(into_principal).transpose()
    }
}

/// Lists clients through the `mentor_clients` stored function.
#[derive(Clone)]
pub struct RpcClientDirectory {
    pool: PgPool,
}

impl RpcClientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientDirectory for RpcClientDirectory {
    fn strategy_name(&self) -> &'static str {
        "mentor_clients_rpc"
    }

    async fn clients_of(&self, mentor_id: Uuid) -> Result<Vec<Principal>, PrincipalStoreError> {
        let timer = QueryTimer::new("mentor_clients_rpc");
        let result = sqlx::query_as::<_, ProfileEntity>(
            "SELECT id, email, display_name, role, mentor_id, created_at FROM mentor_clients($1)",
        )
        .bind(mentor_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        into_principals(result.map_err(backend)?)
    }
}

/// Lists clients by querying the profiles table directly.
#[derive(Clone)]
pub struct TableClientDirectory {
    pool: PgPool,
}

impl TableClientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientDirectory for TableClientDirectory {
    fn strategy_name(&self) -> &'static str {
        "profiles_select"
    }

    async fn clients_of(&self, mentor_id: Uuid) -> Result<Vec<Principal>, PrincipalStoreError> {
        let timer = QueryTimer::new("mentor_clients_select");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT id, email, display_name, role, mentor_id, created_at
            FROM profiles
            WHERE mentor_id = $1 AND role = 'client'
            ORDER BY created_at DESC
            "#,
        )
        .bind(mentor_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        into_principals(result.map_err(backend)?)
    }
}

/// Client directory backed by PostgreSQL: stored function first, table
/// query second.
pub type PgClientDirectory = FallbackClientDirectory<RpcClientDirectory, TableClientDirectory>;

pub fn pg_client_directory(pool: PgPool) -> PgClientDirectory {
    FallbackClientDirectory::new(
        RpcClientDirectory::new(pool.clone()),
        TableClientDirectory::new(pool),
    )
}
