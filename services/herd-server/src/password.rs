//! Password hashing for email/password sign-in.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use thiserror::Error;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 128;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must be between 8 and 128 characters")]
    InvalidLength,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Checks password length bounds.
pub fn validate(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        return Err(PasswordError::InvalidLength);
    }
    Ok(())
}

/// Hashes a password into a PHC string (argon2id, random salt).
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

/// Verifies a password against a stored PHC string.
pub fn verify(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|err| PasswordError::Hash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies() {
        let stored = hash("correct horse").expect("hash");
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify("correct horse", &stored).expect("verify"));
        assert!(!verify("wrong horse", &stored).expect("verify"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("same password").expect("hash");
        let b = hash("same password").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(verify("whatever", "not-a-phc-string").is_err());
    }

    #[test]
    fn validate_bounds() {
        assert!(validate("short").is_err());
        assert!(validate("eight ch").is_ok());
        assert!(validate(&"x".repeat(MAX_PASSWORD_CHARS)).is_ok());
        assert!(validate(&"x".repeat(MAX_PASSWORD_CHARS + 1)).is_err());
    }
}
