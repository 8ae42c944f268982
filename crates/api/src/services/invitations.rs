//! Invitation orchestration: create or refresh, render, deliver.
//!
//! The invitation record is the source of truth. Delivery is attempted
//! after it is persisted and its outcome never rolls the record back, so a
//! failed email can always be retried with a resend.

use chrono::{DateTime, Utc};
use domain::models::{
    Actor, CreateInvitationRequest, DeliveryErrorKind, DeliveryResult, InvitationCode,
    InvitationPagination, InvitationResponse, ListInvitationsQuery, ListInvitationsResponse,
    MailProvider, NewInvitation, PendingInvitation, MAX_CODE_GENERATION_ATTEMPTS,
};
use domain::services::{
    can_access, InvitationStore, PrincipalStore, RequiredRole, ResourceOwner, StoreError,
};
use serde::Serialize;
use shared::invite_code::generate_invite_code;
use shared::validation::normalize_email;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::validation_message;
use crate::services::email::{DeliveryPipeline, InvitationEmailContext, InvitationEmailRenderer};

const FALLBACK_MENTOR_NAME: &str = "Your mentor";

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Only mentors can manage invitations")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("An unused invitation already exists for this email")]
    DuplicateEmail,

    #[error("Invitation not found")]
    NotFound,

    #[error("Invitation has already been used")]
    InvalidState,

    #[error("No unique invitation code after {0} attempts")]
    CodeGenerationExhausted(u32),

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<StoreError> for InvitationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => InvitationError::DuplicateEmail,
            StoreError::NotFound => InvitationError::NotFound,
            StoreError::InvalidState => InvitationError::InvalidState,
            other => InvitationError::Store(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvitationSettings {
    pub max_code_attempts: u32,
    /// Include raw transport errors in caller-facing results.
    pub expose_delivery_detail: bool,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            max_code_attempts: MAX_CODE_GENERATION_ATTEMPTS,
            expose_delivery_detail: false,
        }
    }
}

/// Result of a create, refresh or resend. The record is persisted whatever
/// `delivery` says.
#[derive(Debug, Clone)]
pub struct InvitationOutcome {
    pub invitation: InvitationCode,
    /// An existing unused invitation was extended instead of inserting one.
    pub refreshed: bool,
    pub delivery: DeliveryResult,
}

/// Caller-facing invitation result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResultBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_api_key_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_domain_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_smtp_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_action_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_test_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_recipient: Option<String>,
    pub invitation_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl InvitationResultBody {
    pub fn from_outcome(outcome: &InvitationOutcome, expose_detail: bool) -> Self {
        let invitation = &outcome.invitation;
        let mut body = Self {
            success: outcome.delivery.success(),
            message: None,
            error: None,
            is_api_key_error: None,
            is_domain_error: None,
            is_smtp_error: None,
            admin_action_required: None,
            is_test_mode: None,
            actual_recipient: None,
            intended_recipient: None,
            invitation_id: invitation.id,
            expires_at: invitation.expires_at,
            refreshed: outcome.refreshed,
            detail: None,
        };

        match &outcome.delivery {
            DeliveryResult::Delivered { .. } => {
                body.message = Some(if outcome.refreshed {
                    format!("Invitation refreshed and resent to {}", invitation.email)
                } else {
                    format!("Invitation sent to {}", invitation.email)
                });
            }
            DeliveryResult::TestModeRedirect {
                intended_recipient,
                actual_recipient,
                ..
            } => {
                body.message = Some(format!(
                    "Email service is in test mode: the invitation for {} was delivered to {}",
                    intended_recipient, actual_recipient
                ));
                body.is_test_mode = Some(true);
                body.intended_recipient = Some(intended_recipient.clone());
                body.actual_recipient = Some(actual_recipient.clone());
            }
            DeliveryResult::Failed { kind, detail, .. } => {
                body.error = Some(kind.remediation_hint().to_string());
                body.is_api_key_error = Some(*kind == DeliveryErrorKind::MissingCredentials);
                body.is_domain_error = Some(*kind == DeliveryErrorKind::DomainUnverified);
                body.is_smtp_error = Some(*kind == DeliveryErrorKind::TransportFailure);
                body.admin_action_required = Some(kind.needs_administrator());
                if expose_detail {
                    body.detail = Some(detail.clone());
                }
            }
        }

        body
    }
}

type CodeGenerator = Arc<dyn Fn() -> String + Send + Sync>;

pub struct InvitationService {
    store: Arc<dyn InvitationStore>,
    principals: Arc<dyn PrincipalStore>,
    pipeline: DeliveryPipeline,
    renderer: InvitationEmailRenderer,
    settings: InvitationSettings,
    generate_code: CodeGenerator,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        principals: Arc<dyn PrincipalStore>,
        pipeline: DeliveryPipeline,
        renderer: InvitationEmailRenderer,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            store,
            principals,
            pipeline,
            renderer,
            settings,
            generate_code: Arc::new(generate_invite_code),
        }
    }

    /// Replaces the code generator.
    pub fn with_code_generator(
        mut self,
        generator: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.generate_code = Arc::new(generator);
        self
    }

    pub fn settings(&self) -> &InvitationSettings {
        &self.settings
    }

    pub fn provider(&self) -> MailProvider {
        self.pipeline.provider()
    }

    fn authorize_mentor(actor: Option<&Actor>) -> Result<Actor, InvitationError> {
        let actor = actor.ok_or(InvitationError::Unauthenticated)?;
        if !can_access(actor, RequiredRole::Mentor, None) {
            return Err(InvitationError::Forbidden);
        }
        Ok(*actor)
    }

    /// Invites `client_email`, reusing the mentor's unused invitation for
    /// that address when there is one, then sends the email.
    pub async fn create_or_refresh_and_send(
        &self,
        mentor: Option<&Actor>,
        client_email: &str,
        client_name: &str,
    ) -> Result<InvitationOutcome, InvitationError> {
        let mentor = Self::authorize_mentor(mentor)?;

        let request = CreateInvitationRequest {
            client_email: normalize_email(client_email),
            client_name: client_name.trim().to_string(),
        };
        request
            .validate()
            .map_err(|e| InvitationError::Validation(validation_message(&e)))?;

        let (invitation, refreshed) = self
            .upsert(mentor.id, &request.client_email, &request.client_name)
            .await?;

        info!(
            mentor_id = %mentor.id,
            invitation_id = %invitation.id,
            refreshed,
            "Invitation stored"
        );

        let delivery = self.deliver(&invitation, &request.client_name).await;
        Ok(InvitationOutcome {
            invitation,
            refreshed,
            delivery,
        })
    }

    /// Refreshes one of the mentor's own invitations and sends it again.
    /// Other mentors' invitations are reported as missing.
    pub async fn resend_invitation(
        &self,
        mentor: Option<&Actor>,
        invitation_id: Uuid,
    ) -> Result<InvitationOutcome, InvitationError> {
        let mentor = Self::authorize_mentor(mentor)?;

        let existing = self
            .store
            .find_by_id(invitation_id)
            .await?
            .ok_or(InvitationError::NotFound)?;

        let owner = ResourceOwner::new(existing.id, Some(existing.mentor_id));
        if !can_access(&mentor, RequiredRole::Mentor, Some(&owner)) {
            warn!(
                mentor_id = %mentor.id,
                invitation_id = %invitation_id,
                "Resend attempted on another mentor's invitation"
            );
            return Err(InvitationError::NotFound);
        }

        let invitation = self.store.refresh_invitation(existing.id, None).await?;
        info!(
            mentor_id = %mentor.id,
            invitation_id = %invitation.id,
            "Invitation refreshed for resend"
        );

        let client_name = invitation
            .client_name
            .clone()
            .unwrap_or_else(|| invitation.email.clone());
        let delivery = self.deliver(&invitation, &client_name).await;

        Ok(InvitationOutcome {
            invitation,
            refreshed: true,
            delivery,
        })
    }

    pub async fn list_invitations(
        &self,
        mentor: Option<&Actor>,
        query: &ListInvitationsQuery,
    ) -> Result<ListInvitationsResponse, InvitationError> {
        let mentor = Self::authorize_mentor(mentor)?;
        let status = query.status_filter().map_err(InvitationError::Validation)?;

        let invitations = self
            .store
            .list_for_mentor(mentor.id, status, query.per_page(), query.offset())
            .await?;
        let total = self.store.count_for_mentor(mentor.id, status).await?;
        let summary = self.store.summary_for_mentor(mentor.id).await?;

        Ok(ListInvitationsResponse {
            invitations: invitations.into_iter().map(InvitationResponse::from).collect(),
            pagination: InvitationPagination::new(query.page(), query.per_page(), total),
            summary,
        })
    }

    /// Returns the invitation and whether it already existed.
    async fn upsert(
        &self,
        mentor_id: Uuid,
        email: &str,
        client_name: &str,
    ) -> Result<(InvitationCode, bool), InvitationError> {
        if let Some(pending) = self.store.find_active_invitation(mentor_id, email).await? {
            return Ok((self.refresh(pending, client_name).await?, true));
        }

        match self.create_with_fresh_code(mentor_id, email, client_name).await {
            Ok(invitation) => Ok((invitation, false)),
            Err(InvitationError::DuplicateEmail) => {
                // Lost a race with another request for the same pair.
                match self.store.find_active_invitation(mentor_id, email).await? {
                    Some(pending) => Ok((self.refresh(pending, client_name).await?, true)),
                    None => Err(InvitationError::DuplicateEmail),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(
        &self,
        pending: PendingInvitation,
        client_name: &str,
    ) -> Result<InvitationCode, InvitationError> {
        if pending.is_expired() {
            info!(
                invitation_id = %pending.invitation().id,
                "Reviving expired invitation"
            );
        }
        Ok(self
            .store
            .refresh_invitation(pending.invitation().id, Some(client_name))
            .await?)
    }

    async fn create_with_fresh_code(
        &self,
        mentor_id: Uuid,
        email: &str,
        client_name: &str,
    ) -> Result<InvitationCode, InvitationError> {
        let attempts = self.settings.max_code_attempts;
        for attempt in 1..=attempts {
            let new = NewInvitation {
                mentor_id,
                email: email.to_string(),
                client_name: Some(client_name.to_string()),
                code: (self.generate_code)(),
            };

            match self.store.create_invitation(new).await {
                Ok(invitation) => return Ok(invitation),
                Err(StoreError::CodeCollision) => {
                    warn!(mentor_id = %mentor_id, attempt, "Invitation code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(InvitationError::CodeGenerationExhausted(attempts))
    }

    async fn mentor_name(&self, mentor_id: Uuid) -> String {
        match self.principals.find_by_id(mentor_id).await {
            Ok(Some(mentor)) => mentor.display_name,
            Ok(None) => FALLBACK_MENTOR_NAME.to_string(),
            Err(e) => {
                warn!(mentor_id = %mentor_id, error = %e, "Could not load mentor name");
                FALLBACK_MENTOR_NAME.to_string()
            }
        }
    }

    async fn deliver(&self, invitation: &InvitationCode, client_name: &str) -> DeliveryResult {
        let mentor_name = self.mentor_name(invitation.mentor_id).await;
        let content = self.renderer.render(&InvitationEmailContext {
            client_name,
            mentor_name: &mentor_name,
            code: &invitation.code,
            expires_at: invitation.expires_at,
        });

        let delivery = self
            .pipeline
            .send_invitation(&invitation.email, &content.html, &content.subject)
            .await;

        info!(
            mentor_id = %invitation.mentor_id,
            invitation_id = %invitation.id,
            provider = %delivery.provider(),
            outcome = delivery.outcome_label(),
            error_kind = ?delivery.error_kind(),
            "Invitation delivery attempted"
        );

        delivery
    }
}
