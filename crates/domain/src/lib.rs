//! Domain layer for the mentor invite backend.
//!
//! This crate contains:
//! - Domain models (InvitationCode, Principal, DeliveryResult)
//! - The authorization predicate and route guard
//! - Storage and mail transport contracts, with in-memory implementations

pub mod models;
pub mod services;
