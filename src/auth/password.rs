/// Password hashing and verification.
///
/// Hashing is explicit: the handlers that set a password call
/// [`hash_password`] themselves, so a raw password can never reach the
/// store by accident.

use bcrypt::{hash, verify, DEFAULT_COST};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("failed to hash password: {}", e)))
}

/// Checks a candidate against a stored hash. SSO accounts carry an empty
/// hash; those never verify.
pub fn verify_password(candidate: &str, stored_hash: &str) -> Result<bool, AppError> {
    if stored_hash.is_empty() {
        return Ok(false);
    }
    verify(candidate, stored_hash)
        .map_err(|e| AppError::Internal(format!("failed to verify password: {}", e)))
}

/// Random 8-character alphanumeric password handed to staff accounts
/// provisioned by an admin.
pub fn generate_temporary_password() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn empty_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "").unwrap());
        assert!(!verify_password("", "").unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn temporary_password_shape() {
        let password = generate_temporary_password();
        assert_eq!(password.len(), 8);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_temporary_password(), generate_temporary_password());
    }
}
