/// Password hashing with Argon2id
use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password with a fresh random salt
///
/// Called only on registration and explicit password change; an unchanged
/// secret is never re-hashed on unrelated account updates.
pub fn hash(plain: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(hashed.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// Mismatch returns false; only a corrupt stored hash is an error.
/// Comparison is constant-time inside argon2.
pub fn verify(plain: &str, stored: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(format!("Corrupt password hash: {}", e)))?;

    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
