//! Password hashing for account credentials

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{AuthError, LedgerError};

#[cfg(not(test))]
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

// Debug builds make the default cost painfully slow across the test suite.
#[cfg(test)]
fn hasher() -> Argon2<'static> {
    use argon2::{Algorithm, Params, Version};
    let params = Params::new(1024, 1, 1, None).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, LedgerError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LedgerError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored hash. An empty hash never verifies.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    if password_hash.is_empty() {
        return Err(AuthError::BadCredential);
    }
    let parsed_hash = PasswordHash::new(password_hash).map_err(|_| AuthError::BadCredential)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::BadCredential)
}
