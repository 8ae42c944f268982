//! Client self-registration with an invitation code.

use domain::models::{NewClient, Principal, RedeemInvitationRequest};
use domain::services::{InvitationStore, PrincipalStore, PrincipalStoreError, StoreError};
use metrics::counter;
use shared::invite_code::is_valid_invite_code_format;
use shared::password::hash_password;
use shared::validation::normalize_email;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

use crate::error::validation_message;

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Unknown, used, expired or malformed code. Callers never learn which.
    #[error("Invalid or expired invitation code")]
    InvalidOrExpired,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Registration failed: {0}")]
    Internal(String),
}

fn record_redemption(outcome: &'static str) {
    counter!("invitation_redemptions_total", "outcome" => outcome).increment(1);
}

pub struct RegistrationService {
    invitations: Arc<dyn InvitationStore>,
    principals: Arc<dyn PrincipalStore>,
}

impl RegistrationService {
    pub fn new(invitations: Arc<dyn InvitationStore>, principals: Arc<dyn PrincipalStore>) -> Self {
        Self {
            invitations,
            principals,
        }
    }

    /// Consumes the code and creates the client linked to the inviting
    /// mentor. No session is issued.
    pub async fn redeem(
        &self,
        request: RedeemInvitationRequest,
    ) -> Result<Principal, RegistrationError> {
        let code = request.code.trim().to_string();
        if !is_valid_invite_code_format(&code) {
            warn!(cause = "malformed_code", "Invitation redemption denied");
            record_redemption("denied");
            return Err(RegistrationError::InvalidOrExpired);
        }

        let request = RedeemInvitationRequest {
            code,
            email: normalize_email(&request.email),
            name: request.name.trim().to_string(),
            password: request.password,
        };
        request
            .validate()
            .map_err(|e| RegistrationError::Validation(validation_message(&e)))?;

        // Checked before consuming so a taken address does not burn the code.
        let taken = self
            .principals
            .email_exists(&request.email)
            .await
            .map_err(|e| RegistrationError::Internal(e.to_string()))?;
        if taken {
            record_redemption("email_taken");
            return Err(RegistrationError::EmailTaken);
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| RegistrationError::Internal(e.to_string()))?;

        let invitation = match self.invitations.mark_used(&request.code).await {
            Ok(invitation) => invitation,
            Err(StoreError::InvalidOrExpired(cause)) => {
                warn!(cause = %cause, "Invitation redemption denied");
                record_redemption("denied");
                return Err(RegistrationError::InvalidOrExpired);
            }
            Err(e) => return Err(RegistrationError::Internal(e.to_string())),
        };

        let created = self
            .principals
            .create_client(NewClient {
                email: request.email.clone(),
                display_name: request.name.clone(),
                password_hash,
                mentor_id: invitation.mentor_id,
            })
            .await;

        match created {
            Ok(client) => {
                info!(
                    invitation_id = %invitation.id,
                    mentor_id = %invitation.mentor_id,
                    client_id = %client.id,
                    "Invitation redeemed"
                );
                record_redemption("redeemed");
                Ok(client)
            }
            Err(PrincipalStoreError::DuplicateEmail) => {
                error!(
                    invitation_id = %invitation.id,
                    "Invitation consumed but the email was registered concurrently"
                );
                record_redemption("email_taken");
                Err(RegistrationError::EmailTaken)
            }
            Err(e) => {
                error!(
                    invitation_id = %invitation.id,
                    error = %e,
                    "Invitation consumed but client creation failed"
                );
                Err(RegistrationError::Internal(e.to_string()))
            }
        }
    }
}
