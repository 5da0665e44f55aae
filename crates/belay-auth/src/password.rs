//! Credential checks against stored Argon2id hashes, plus the length
//! policy applied before any credential is stored.
//!
//! The principal repository does the hashing; both sides must agree on
//! the pepper, which is prefixed to the plaintext.

use std::borrow::Cow;

use argon2::password_hash::{Error as HashError, PasswordHash};
use argon2::{Argon2, PasswordVerifier};

use crate::config::AuthConfig;
use crate::error::AuthError;

fn with_pepper<'a>(password: &'a str, pepper: Option<&str>) -> Cow<'a, str> {
    match pepper {
        Some(pepper) => Cow::Owned(format!("{pepper}{password}")),
        None => Cow::Borrowed(password),
    }
}

/// `Ok(false)` means the candidate is wrong. An error means the stored
/// hash itself is unusable.
pub fn verify_password(
    candidate: &str,
    stored_hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let stored = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::Crypto(format!("stored hash unreadable: {e}")))?;
    let candidate = with_pepper(candidate, pepper);

    match Argon2::default().verify_password(candidate.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(other) => Err(AuthError::Crypto(other.to_string())),
    }
}

/// Length is counted in characters, not bytes.
pub fn check_policy(password: &str, config: &AuthConfig) -> Result<(), AuthError> {
    let min = config.min_password_length;
    if password.chars().count() >= min {
        Ok(())
    } else {
        Err(AuthError::PasswordTooShort { min })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordHasher;
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;

    fn stored(password: &str, pepper: Option<&str>) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(with_pepper(password, pepper).as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn accepts_matching_and_rejects_other_candidates() {
        let hash = stored("anchor-sling-42", None);
        assert!(verify_password("anchor-sling-42", &hash, None).unwrap());
        assert!(!verify_password("anchor-sling-43", &hash, None).unwrap());
    }

    #[test]
    fn pepper_must_match() {
        let hash = stored("anchor-sling-42", Some("pepper!"));
        assert!(verify_password("anchor-sling-42", &hash, Some("pepper!")).unwrap());
        assert!(!verify_password("anchor-sling-42", &hash, None).unwrap());
        assert!(!verify_password("anchor-sling-42", &hash, Some("other")).unwrap());
    }

    #[test]
    fn unreadable_hash_is_an_error() {
        assert!(matches!(
            verify_password("anything", "plaintext-in-db", None),
            Err(AuthError::Crypto(_))
        ));
    }

    #[test]
    fn policy_counts_characters() {
        let config = AuthConfig::default();
        assert!(matches!(
            check_policy("short", &config),
            Err(AuthError::PasswordTooShort { min: 12 })
        ));
        // Twelve characters, more than twelve bytes.
        assert!(check_policy("ééééééééééé1", &config).is_ok());
        assert!(check_policy("long enough password", &config).is_ok());
    }
}
