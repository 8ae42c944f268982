//! Domain services for the mentor invite backend.
//!
//! Authorization rules plus the storage and transport contracts the API
//! layer is built against.

pub mod authorization;
pub mod client_directory;
pub mod invitation_store;
pub mod mail_transport;
pub mod principal_store;

pub use authorization::{
    can_access, can_view_profile, guard_route, home_route, GuardDecision, RequiredRole,
    ResourceOwner, SessionState, LOGIN_ROUTE,
};
pub use client_directory::{ClientDirectory, FallbackClientDirectory, ServedBy};
pub use invitation_store::{
    InMemoryInvitationStore, InvitationStore, RedemptionDenial, StoreError,
};
pub use mail_transport::{MailTransport, MockMailTransport, SentMail};
pub use principal_store::{InMemoryPrincipalStore, PrincipalStore, PrincipalStoreError};
