//! Invitation code domain models.
//!
//! An invitation is a time-boxed, single-use code a mentor sends to a
//! prospective client. It is refreshed (never duplicated) while unused and
//! becomes inert once redeemed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Days an invitation stays valid after creation or refresh.
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Attempts at generating a code that does not collide with a live one.
pub const MAX_CODE_GENERATION_ATTEMPTS: u32 = 5;

/// A persisted invitation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationCode {
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

impl InvitationCode {
    /// Status of the invitation at `now`. A used invitation reports `Used`
    /// even after its expiry has passed.
    pub fn status_at(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.is_used {
            InvitationStatus::Used
        } else if now > self.expires_at {
            InvitationStatus::Expired
        } else {
            InvitationStatus::Pending
        }
    }

    pub fn status(&self) -> InvitationStatus {
        self.status_at(Utc::now())
    }

    /// Unused and unexpired at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == InvitationStatus::Pending
    }
}

/// Expiry for an invitation created or refreshed at `now`.
pub fn invitation_expiry_from(now: DateTime<Utc>, ttl_days: i64) -> DateTime<Utc> {
    now + Duration::days(ttl_days)
}

/// Invitation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Used,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Used => "used",
            InvitationStatus::Expired => "expired",
        }
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(InvitationStatus::Pending),
            "used" => Ok(InvitationStatus::Used),
            "expired" => Ok(InvitationStatus::Expired),
            _ => Err(format!("Invalid invitation status: {}", s)),
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unused invitation for a (mentor, email) pair.
///
/// Lookups never hand out an expired record as if it were active; the
/// caller decides whether to refresh an expired one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInvitation {
    Active(InvitationCode),
    Expired(InvitationCode),
}

impl PendingInvitation {
    /// Tags an unused invitation by its expiry at `now`.
    pub fn from_unused(invitation: InvitationCode, now: DateTime<Utc>) -> Self {
        if now > invitation.expires_at {
            PendingInvitation::Expired(invitation)
        } else {
            PendingInvitation::Active(invitation)
        }
    }

    pub fn invitation(&self) -> &InvitationCode {
        match self {
            PendingInvitation::Active(inv) | PendingInvitation::Expired(inv) => inv,
        }
    }

    pub fn into_invitation(self) -> InvitationCode {
        match self {
            PendingInvitation::Active(inv) | PendingInvitation::Expired(inv) => inv,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, PendingInvitation::Expired(_))
    }
}

/// Data needed to insert a new invitation.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub mentor_id: Uuid,
    pub email: String,
    pub client_name: Option<String>,
    pub code: String,
}

/// Request to invite a client.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub client_email: String,

    #[validate(custom(function = "shared::validation::validate_display_name"))]
    pub client_name: String,
}

/// Registration submitted by an invited client.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemInvitationRequest {
    #[validate(custom(function = "shared::validation::validate_invite_code"))]
    pub code: String,

    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,

    #[validate(custom(function = "shared::validation::validate_display_name"))]
    pub name: String,
}

/// Invitation as listed on the mentor dashboard. The code itself is shown
/// so the mentor can share it out of band.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub id: Uuid,
    pub code: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl From<InvitationCode> for InvitationResponse {
    fn from(inv: InvitationCode) -> Self {
        let status = inv.status();
        Self {
            id: inv.id,
            code: inv.code,
            email: inv.email,
            client_name: inv.client_name,
            status,
            created_at: inv.created_at,
            expires_at: inv.expires_at,
            used_at: inv.used_at,
        }
    }
}

/// Query parameters for listing invitations.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListInvitationsQuery {
    /// "pending", "used", "expired" or "all" (default: "all").
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListInvitationsQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(50).clamp(1, 100)
    }

    /// Row offset for the requested page, saturating for absurd page numbers.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }

    /// Status filter; `None` means every status. Unknown values are an error.
    pub fn status_filter(&self) -> Result<Option<InvitationStatus>, String> {
        match self.status.as_deref() {
            None | Some("all") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

/// Response for listing invitations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvitationsResponse {
    pub invitations: Vec<InvitationResponse>,
    pub pagination: InvitationPagination,
    pub summary: InvitationSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationPagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl InvitationPagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Counts of a mentor's invitations per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationSummary {
    pub pending: i64,
    pub used: i64,
    pub expired: i64,
}
