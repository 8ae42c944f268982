//! Common validation utilities.

use validator::ValidationError;

use crate::invite_code::is_valid_invite_code_format;

/// Maximum length of a display name.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// Validates that an invitation code has the expected local format.
pub fn validate_invite_code(code: &str) -> Result<(), ValidationError> {
    if is_valid_invite_code_format(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invite_code_format");
        err.message = Some("Invalid or expired invitation code".into());
        Err(err)
    }
}

/// Validates that a display name is not blank once trimmed.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some("Name must be at most 100 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Normalizes an email address for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
