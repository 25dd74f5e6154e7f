/// Password Hashing and Verification
///
/// bcrypt digests embed their own salt and cost; comparison inside the
/// bcrypt crate is constant-time.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::error::{AppError, AuthError, ValidationError};

pub const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt only looks at the first 72 bytes
pub const MAX_PASSWORD_LENGTH: usize = 72;

lazy_static! {
    // Same cost as real digests
    static ref UNKNOWN_USER_DIGEST: Option<String> =
        hash("no-such-user", DEFAULT_COST).ok();
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its digest
///
/// A wrong password and a digest that cannot be parsed both fail with
/// `InvalidCredential`, so callers cannot tell them apart.
pub fn verify_password(password: &str, digest: &str) -> Result<(), AuthError> {
    match verify(password, digest) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::InvalidCredential),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password digest is unreadable");
            Err(AuthError::InvalidCredential)
        }
    }
}

/// Fail a login for a name with no stored credential.
///
/// Still runs one full bcrypt verification, so an unknown email takes as
/// long to reject as a wrong password.
pub fn reject_unknown_user(password: &str) -> AuthError {
    if let Some(digest) = UNKNOWN_USER_DIGEST.as_ref() {
        let _ = verify(password, digest);
    }
    AuthError::InvalidCredential
}

/// Validate password policy for new or replaced credentials
///
/// Requirements:
/// - Minimum 8 bytes
/// - Maximum 72 bytes
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    Ok(())
}
