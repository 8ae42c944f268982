//! Repository implementations for database operations.

pub mod invitation_code;
pub mod profile;

pub use invitation_code::InvitationCodeRepository;
pub use profile::{
    pg_client_directory, PgClientDirectory, ProfileRepository, RpcClientDirectory,
    TableClientDirectory,
};
