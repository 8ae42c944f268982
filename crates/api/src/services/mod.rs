//! Application services behind the HTTP routes.

pub mod email;
pub mod invitations;
pub mod registration;

pub use invitations::{
    InvitationError, InvitationOutcome, InvitationResultBody, InvitationService,
    InvitationSettings,
};
pub use registration::{RegistrationError, RegistrationService};
