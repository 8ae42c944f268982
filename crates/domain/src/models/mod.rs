//! Domain models for the mentor invite backend.

pub mod delivery;
pub mod invitation;
pub mod principal;

pub use delivery::{
    classify_transport_error, DeliveryErrorKind, DeliveryResult, MailProvider, TransportError,
    TransportReceipt,
};
pub use invitation::{
    invitation_expiry_from, CreateInvitationRequest, InvitationCode, InvitationPagination,
    InvitationResponse, InvitationStatus, InvitationSummary, ListInvitationsQuery,
    ListInvitationsResponse, NewInvitation, PendingInvitation, RedeemInvitationRequest,
    INVITATION_TTL_DAYS, MAX_CODE_GENERATION_ATTEMPTS,
};
pub use principal::{Actor, NewClient, Principal, PrincipalResponse, Role};
