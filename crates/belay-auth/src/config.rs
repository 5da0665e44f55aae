//! Authentication configuration.

use chrono::Duration;

use crate::error::AuthError;

/// Longest lifetime accepted for sessions and linking codes (ten years).
pub const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration for the auth services.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default: 43_200 = 12 hours).
    pub session_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing and
    /// verification. Must match the pepper the principal repository was
    /// built with.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Random characters in a generated linking code, excluding the
    /// kind prefix.
    pub linking_code_length: usize,
    /// How long an issued code stays claimable (default: 30 days).
    /// `None` issues codes that never lapse.
    pub linking_code_lifetime_secs: Option<u64>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime_secs: 43_200,
            pepper: None,
            min_password_length: 12,
            linking_code_length: 12,
            linking_code_lifetime_secs: Some(2_592_000),
        }
    }
}

impl AuthConfig {
    pub fn session_lifetime(&self) -> Result<Duration, AuthError> {
        lifetime("session", self.session_lifetime_secs)
    }

    pub fn linking_code_lifetime(&self) -> Result<Option<Duration>, AuthError> {
        self.linking_code_lifetime_secs
            .map(|secs| lifetime("linking code", secs))
            .transpose()
    }
}

/// A positive lifetime no longer than [`MAX_LIFETIME_SECS`].
pub fn lifetime(what: &'static str, secs: u64) -> Result<Duration, AuthError> {
    if secs == 0 || secs > MAX_LIFETIME_SECS {
        return Err(AuthError::LifetimeOutOfRange { what, secs });
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or(AuthError::LifetimeOutOfRange { what, secs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_range() {
        let config = AuthConfig::default();
        assert_eq!(config.session_lifetime().unwrap(), Duration::hours(12));
        assert_eq!(config.linking_code_lifetime().unwrap(), Some(Duration::days(30)));
    }

    #[test]
    fn zero_and_huge_lifetimes_are_rejected() {
        for secs in [0, MAX_LIFETIME_SECS + 1, i64::MAX as u64, u64::MAX] {
            assert!(matches!(
                lifetime("session", secs),
                Err(AuthError::LifetimeOutOfRange { secs: s, .. }) if s == secs
            ));
        }
        assert!(lifetime("session", MAX_LIFETIME_SECS).is_ok());
    }
}
