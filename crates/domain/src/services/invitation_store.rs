//! Invitation storage contract.
//!
//! Every state transition is a single check-and-mutate at the storage
//! layer. Callers never read-then-write to decide whether a code may be
//! redeemed or an invitation refreshed.

use crate::models::{
    invitation_expiry_from, InvitationCode, InvitationStatus, InvitationSummary, NewInvitation,
    PendingInvitation, INVITATION_TTL_DAYS,
};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Why a redemption was denied. Logged for operators, never shown to the
/// person redeeming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionDenial {
    UnknownCode,
    AlreadyUsed,
    Expired,
}

impl RedemptionDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionDenial::UnknownCode => "unknown_code",
            RedemptionDenial::AlreadyUsed => "already_used",
            RedemptionDenial::Expired => "expired",
        }
    }

    /// Diagnoses a failed redemption from whatever record the code maps to.
    pub fn diagnose(record: Option<&InvitationCode>) -> Self {
        match record {
            None => RedemptionDenial::UnknownCode,
            Some(inv) if inv.is_used => RedemptionDenial::AlreadyUsed,
            Some(_) => RedemptionDenial::Expired,
        }
    }
}

impl fmt::Display for RedemptionDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("An unused invitation already exists for this email")]
    DuplicateEmail,

    #[error("Invitation code is already in use")]
    CodeCollision,

    #[error("Invitation not found")]
    NotFound,

    #[error("Invitation has already been used")]
    InvalidState,

    #[error("Invalid or expired invitation code ({0})")]
    InvalidOrExpired(RedemptionDenial),

    #[error("Storage error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// The unused invitation for `(mentor_id, email)`, tagged by expiry.
    /// Email comparison is case-insensitive. Used records are never returned.
    async fn find_active_invitation(
        &self,
        mentor_id: Uuid,
        email: &str,
    ) -> Result<Option<PendingInvitation>, StoreError>;

    /// Inserts a new invitation expiring one TTL from now.
    ///
    /// Returns `DuplicateEmail` when the pair already has an unused
    /// invitation and `CodeCollision` when the code is taken.
    async fn create_invitation(&self, new: NewInvitation) -> Result<InvitationCode, StoreError>;

    /// Pushes expiry out one TTL from now and, when given, replaces the
    /// stored client name. Only unused invitations refresh; a used one
    /// yields `InvalidState`.
    async fn refresh_invitation(
        &self,
        id: Uuid,
        client_name: Option<&str>,
    ) -> Result<InvitationCode, StoreError>;

    /// Consumes a code. At most one caller ever succeeds per code.
    async fn mark_used(&self, code: &str) -> Result<InvitationCode, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InvitationCode>, StoreError>;

    /// Newest first.
    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InvitationCode>, StoreError>;

    async fn count_for_mentor(
        &self,
        mentor_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<i64, StoreError>;

    async fn summary_for_mentor(&self, mentor_id: Uuid) -> Result<InvitationSummary, StoreError>;
}

/// In-process store with the same atomicity as the SQL repository: each
/// operation holds the lock for its whole check-and-mutate.
#[derive(Debug)]
pub struct InMemoryInvitationStore {
    invitations: Mutex<Vec<InvitationCode>>,
    ttl_days: i64,
}

impl Default for InMemoryInvitationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryInvitationStore {
    pub fn new() -> Self {
        Self::with_ttl_days(INVITATION_TTL_DAYS)
    }

    pub fn with_ttl_days(ttl_days: i64) -> Self {
        Self {
            invitations: Mutex::new(Vec::new()),
            ttl_days,
        }
    }

    /// Inserts a record as-is, bypassing uniqueness checks.
    pub async fn seed(&self, invitation: InvitationCode) {
        self.invitations.lock().await.push(invitation);
    }

    /// Moves an invitation's expiry into the past.
    pub async fn expire(&self, id: Uuid) -> bool {
        let mut invitations = self.invitations.lock().await;
        match invitations.iter_mut().find(|inv| inv.id == id) {
            Some(inv) => {
                inv.expires_at = Utc::now() - chrono::Duration::seconds(1);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.invitations.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.invitations.lock().await.is_empty()
    }

    fn matches_status(inv: &InvitationCode, status: Option<InvitationStatus>) -> bool {
        status.map_or(true, |s| inv.status() == s)
    }
}

#[async_trait]
impl InvitationStore for InMemoryInvitationStore {
    async fn find_active_invitation(
        &self,
        mentor_id: Uuid,
        email: &str,
    ) -> Result<Option<PendingInvitation>, StoreError> {
        let now = Utc::now();
        let invitations = self.invitations.lock().await;
        Ok(invitations
            .iter()
            .find(|inv| {
                inv.mentor_id == mentor_id && !inv.is_used && inv.email.eq_ignore_ascii_case(email)
            })
            .cloned()
            .map(|inv| PendingInvitation::from_unused(inv, now)))
    }

    async fn create_invitation(&self, new: NewInvitation) -> Result<InvitationCode, StoreError> {
        let mut invitations = self.invitations.lock().await;

        let unused = invitations.iter().filter(|inv| !inv.is_used);
        for inv in unused {
            if inv.mentor_id == new.mentor_id && inv.email.eq_ignore_ascii_case(&new.email) {
                return Err(StoreError::DuplicateEmail);
            }
            if inv.code == new.code {
                return Err(StoreError::CodeCollision);
            }
        }

        let now = Utc::now();
        let invitation = InvitationCode {
            id: Uuid::new_v4(),
            code: new.code,
            mentor_id: new.mentor_id,
            email: new.email,
            client_name: new.client_name,
            is_used: false,
            used_at: None,
            created_at: now,
            expires_at: invitation_expiry_from(now, self.ttl_days),
        };
        invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn refresh_invitation(
        &self,
        id: Uuid,
        client_name: Option<&str>,
    ) -> Result<InvitationCode, StoreError> {
        let mut invitations = self.invitations.lock().await;
        let inv = invitations
            .iter_mut()
            .find(|inv| inv.id == id)
            .ok_or(StoreError::NotFound)?;

        if inv.is_used {
            return Err(StoreError::InvalidState);
        }
        inv.expires_at = invitation_expiry_from(Utc::now(), self.ttl_days);
        if let Some(name) = client_name {
            inv.client_name = Some(name.to_string());
        }
        Ok(inv.clone())
    }

    async fn mark_used(&self, code: &str) -> Result<InvitationCode, StoreError> {
        let now = Utc::now();
        let mut invitations = self.invitations.lock().await;

        if let Some(inv) = invitations
            .iter_mut()
            .find(|inv| inv.code == code && !inv.is_used && inv.expires_at >= now)
        {
            inv.is_used = true;
            inv.used_at = Some(now);
            return Ok(inv.clone());
        }

        // Prefer the unused record when a consumed one shares the code.
        let record = invitations
            .iter()
            .filter(|inv| inv.code == code)
            .min_by_key(|inv| inv.is_used);
        Err(StoreError::InvalidOrExpired(RedemptionDenial::diagnose(
            record,
        )))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InvitationCode>, StoreError> {
        let invitations = self.invitations.lock().await;
        Ok(invitations.iter().find(|inv| inv.id == id).cloned())
    }

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InvitationCode>, StoreError> {
        let invitations = self.invitations.lock().await;
        let mut own: Vec<InvitationCode> = invitations
            .iter()
            .filter(|inv| inv.mentor_id == mentor_id && Self::matches_status(inv, status))
            .cloned()
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(own
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_for_mentor(
        &self,
        mentor_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> Result<i64, StoreError> {
        let invitations = self.invitations.lock().await;
        Ok(invitations
            .iter()
            .filter(|inv| inv.mentor_id == mentor_id && Self::matches_status(inv, status))
            .count() as i64)
    }

    async fn summary_for_mentor(&self, mentor_id: Uuid) -> Result<InvitationSummary, StoreError> {
        let now = Utc::now();
        let invitations = self.invitations.lock().await;
        let mut summary = InvitationSummary::default();
        for inv in invitations.iter().filter(|inv| inv.mentor_id == mentor_id) {
            match inv.status_at(now) {
                InvitationStatus::Pending => summary.pending += 1,
                InvitationStatus::Used => summary.used += 1,
                InvitationStatus::Expired => summary.expired += 1,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_invitation(mentor_id: Uuid, email: &str, code: &str) -> NewInvitation {
        NewInvitation {
            mentor_id,
            email: email.to_string(),
            client_name: Some("Carla".to_string()),
            code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_sets_seven_day_expiry() {
        let store = InMemoryInvitationStore::new();
        let inv = store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();

        assert!(!inv.is_used);
        assert_eq!((inv.expires_at - inv.created_at).num_days(), 7);
    }

    #[tokio::test]
    async fn test_create_duplicate_pair_is_rejected_case_insensitively() {
        let store = InMemoryInvitationStore::new();
        let mentor = Uuid::new_v4();
        store
            .create_invitation(new_invitation(mentor, "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();

        let err = store
            .create_invitation(new_invitation(mentor, "C@Example.com", "Zyxwvuts987@"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_create_code_collision() {
        let store = InMemoryInvitationStore::new();
        store
            .create_invitation(new_invitation(Uuid::new_v4(), "a@example.com", "Abcdefgh123!"))
            .await
            .unwrap();

        let err = store
            .create_invitation(new_invitation(Uuid::new_v4(), "b@example.com", "Abcdefgh123!"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CodeCollision));
    }

    #[tokio::test]
    async fn test_same_email_different_mentors_allowed() {
        let store = InMemoryInvitationStore::new();
        store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();
        store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Zyxwvuts987@"))
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_active_tags_expired_records() {
        let store = InMemoryInvitationStore::new();
        let mentor = Uuid::new_v4();
        let inv = store
            .create_invitation(new_invitation(mentor, "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();

        let found = store
            .find_active_invitation(mentor, "c@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!found.is_expired());

        store.expire(inv.id).await;
        let found = store
            .find_active_invitation(mentor, "c@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(found.is_expired());
    }

    #[tokio::test]
    async fn test_find_active_ignores_used() {
        let store = InMemoryInvitationStore::new();
        let mentor = Uuid::new_v4();
        store
            .create_invitation(new_invitation(mentor, "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();
        store.mark_used("Abcdefgh123!").await.unwrap();

        assert!(store
            .find_active_invitation(mentor, "c@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_refresh_extends_expiry() {
        let store = InMemoryInvitationStore::new();
        let inv = store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();
        store.expire(inv.id).await;

        let refreshed = store.refresh_invitation(inv.id, None).await.unwrap();
        assert!(refreshed.expires_at > Utc::now());
        assert!(!refreshed.is_used);
        assert_eq!(refreshed.code, inv.code);
        assert_eq!(refreshed.client_name.as_deref(), Some("Carla"));
    }

    #[tokio::test]
    async fn test_refresh_replaces_client_name_when_given() {
        let store = InMemoryInvitationStore::new();
        let inv = store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();

        let refreshed = store
            .refresh_invitation(inv.id, Some("Carla Mendes"))
            .await
            .unwrap();
        assert_eq!(refreshed.client_name.as_deref(), Some("Carla Mendes"));

        let stored = store.find_by_id(inv.id).await.unwrap().unwrap();
        assert_eq!(stored.client_name.as_deref(), Some("Carla Mendes"));
    }

    #[tokio::test]
    async fn test_refresh_used_is_invalid_state() {
        let store = InMemoryInvitationStore::new();
        let inv = store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();
        store.mark_used(&inv.code).await.unwrap();

        assert!(matches!(
            store.refresh_invitation(inv.id, None).await,
            Err(StoreError::InvalidState)
        ));
        let still_used = store.find_by_id(inv.id).await.unwrap().unwrap();
        assert!(still_used.is_used);
    }

    #[tokio::test]
    async fn test_refresh_unknown_is_not_found() {
        let store = InMemoryInvitationStore::new();
        assert!(matches!(
            store.refresh_invitation(Uuid::new_v4(), None).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_mark_used_diagnoses_denials() {
        let store = InMemoryInvitationStore::new();
        let inv = store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();

        assert!(matches!(
            store.mark_used("Nonexistent1!").await,
            Err(StoreError::InvalidOrExpired(RedemptionDenial::UnknownCode))
        ));

        store.expire(inv.id).await;
        assert!(matches!(
            store.mark_used(&inv.code).await,
            Err(StoreError::InvalidOrExpired(RedemptionDenial::Expired))
        ));

        store.refresh_invitation(inv.id, None).await.unwrap();
        let used = store.mark_used(&inv.code).await.unwrap();
        assert!(used.is_used);
        assert!(used.used_at.is_some());

        assert!(matches!(
            store.mark_used(&inv.code).await,
            Err(StoreError::InvalidOrExpired(RedemptionDenial::AlreadyUsed))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_redemption_succeeds_once() {
        let store = Arc::new(InMemoryInvitationStore::new());
        let inv = store
            .create_invitation(new_invitation(Uuid::new_v4(), "c@example.com", "Abcdefgh123!"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let code = inv.code.clone();
                tokio::spawn(async move { store.mark_used(&code).await })
            })
            .collect();

        let mut successes = 0;
        let mut denials = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::InvalidOrExpired(_)) => denials += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(denials, 15);
    }

    #[tokio::test]
    async fn test_concurrent_creates_leave_one_unused() {
        let store = Arc::new(InMemoryInvitationStore::new());
        let mentor = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let code = format!("Abcdefgh12{}!", i);
                    store
                        .create_invitation(new_invitation(mentor, "c@example.com", &code))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(StoreError::DuplicateEmail) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.count_for_mentor(mentor, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_and_summary() {
        let store = InMemoryInvitationStore::new();
        let mentor = Uuid::new_v4();
        let a = store
            .create_invitation(new_invitation(mentor, "a@example.com", "Aaaaaaaa111!"))
            .await
            .unwrap();
        let b = store
            .create_invitation(new_invitation(mentor, "b@example.com", "Bbbbbbbb222!"))
            .await
            .unwrap();
        store
            .create_invitation(new_invitation(mentor, "c@example.com", "Cccccccc333!"))
            .await
            .unwrap();
        store
            .create_invitation(new_invitation(Uuid::new_v4(), "d@example.com", "Dddddddd444!"))
            .await
            .unwrap();

        store.mark_used(&a.code).await.unwrap();
        store.expire(b.id).await;

        let summary = store.summary_for_mentor(mentor).await.unwrap();
        assert_eq!(
            summary,
            InvitationSummary {
                pending: 1,
                used: 1,
                expired: 1
            }
        );

        let all = store.list_for_mentor(mentor, None, 10, 0).await.unwrap();
        assert_eq!(all.len(), 3);

        let used = store
            .list_for_mentor(mentor, Some(InvitationStatus::Used), 10, 0)
            .await
            .unwrap();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].id, a.id);

        let page = store.list_for_mentor(mentor, None, 2, 2).await.unwrap();
        assert_eq!(page.len(), 1);
    }
}
