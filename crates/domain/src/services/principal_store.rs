//! Principal (profile) storage contract.

use crate::models::{Actor, NewClient, Principal, Role};
use crate::services::authorization::{can_view_profile, ResourceOwner};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PrincipalStoreError {
    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("Storage error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn email_exists(&self, email: &str) -> Result<bool, PrincipalStoreError>;

    /// Creates a client profile linked to its inviting mentor.
    async fn create_client(&self, new: NewClient) -> Result<Principal, PrincipalStoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, PrincipalStoreError>;

    /// The profile if `actor` may see it. Hidden and missing profiles are
    /// indistinguishable.
    async fn find_visible_profile(
        &self,
        actor: &Actor,
        profile_id: Uuid,
    ) -> Result<Option<Principal>, PrincipalStoreError>;
}

/// In-process principal store for tests.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    principals: Mutex<Vec<Principal>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mentor directly.
    pub async fn add_mentor(&self, email: &str, display_name: &str) -> Principal {
        let mentor = Principal {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            display_name: display_name.to_string(),
            role: Role::Mentor,
            mentor_id: None,
            created_at: Utc::now(),
        };
        self.principals.lock().await.push(mentor.clone());
        mentor
    }

    pub async fn len(&self) -> usize {
        self.principals.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.principals.lock().await.is_empty()
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn email_exists(&self, email: &str) -> Result<bool, PrincipalStoreError> {
        let principals = self.principals.lock().await;
        Ok(principals.iter().any(|p| p.email.eq_ignore_ascii_case(email)))
    }

    async fn create_client(&self, new: NewClient) -> Result<Principal, PrincipalStoreError> {
        let mut principals = self.principals.lock().await;
        if principals
            .iter()
            .any(|p| p.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(PrincipalStoreError::DuplicateEmail);
        }

        let client = Principal {
            id: Uuid::new_v4(),
            email: new.email.to_lowercase(),
            display_name: new.display_name,
            role: Role::Client,
            mentor_id: Some(new.mentor_id),
            created_at: Utc::now(),
        };
        principals.push(client.clone());
        Ok(client)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, PrincipalStoreError> {
        let principals = self.principals.lock().await;
        Ok(principals.iter().find(|p| p.id == id).cloned())
    }

    async fn find_visible_profile(
        &self,
        actor: &Actor,
        profile_id: Uuid,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        let principals = self.principals.lock().await;
        Ok(principals
            .iter()
            .find(|p| p.id == profile_id)
            .filter(|p| can_view_profile(actor, &ResourceOwner::new(p.id, p.mentor_id)))
            .cloned())
    }
}
