//! Shared utilities and common types for the mentor invite backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Invitation code generation and format checks
//! - Password hashing with Argon2id
//! - Bearer token validation
//! - Common validation logic

pub mod invite_code;
pub mod jwt;
pub mod password;
pub mod validation;
