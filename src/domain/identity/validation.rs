//! Identity input validation

use thiserror::Error;

/// Validation errors for registration input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityValidationError {
    #[error("Invalid email")]
    EmptyEmail,

    #[error("Invalid email")]
    MissingAtSign,
}

/// Validate an email address for registration.
///
/// Only requires a non-empty value containing `@`; returns the trimmed address.
pub fn validate_email(email: &str) -> Result<&str, IdentityValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(IdentityValidationError::EmptyEmail);
    }

    if !email.contains('@') {
        return Err(IdentityValidationError::MissingAtSign);
    }

    Ok(email)
}
