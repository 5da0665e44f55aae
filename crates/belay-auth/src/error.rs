//! Authentication error types.

use belay_core::error::BelayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown login, wrong password and deactivated account all map
    /// here so a caller cannot tell them apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session has expired")]
    SessionExpired,

    #[error("invalid session")]
    SessionInvalid,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("{what} lifetime of {secs}s is out of range")]
    LifetimeOutOfRange { what: &'static str, secs: u64 },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for BelayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::SessionExpired | AuthError::SessionInvalid => {
                BelayError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::PasswordTooShort { .. } => BelayError::Validation {
                message: err.to_string(),
            },
            AuthError::LifetimeOutOfRange { .. } => BelayError::Internal(err.to_string()),
            AuthError::Crypto(msg) => BelayError::Crypto(msg),
        }
    }
}
