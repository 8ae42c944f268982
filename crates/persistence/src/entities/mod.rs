//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod invitation_code;
pub mod profile;

pub use invitation_code::InvitationCodeEntity;
pub use profile::ProfileEntity;
