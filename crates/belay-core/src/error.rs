//! Error types for the Belay system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BelayError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Unknown, revoked or already-bound linking code. Retryable by the
    /// caller with a different code.
    #[error("Invalid linking code")]
    InvalidLinkingCode,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Tenant context missing or invalid")]
    TenantContext,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BelayError {
    /// The generic not-found error used whenever tenant scoping hides a
    /// record. Carries no detail about whether the record exists.
    pub fn hidden(entity: &str) -> Self {
        BelayError::NotFound {
            entity: entity.into(),
            id: "unavailable".into(),
        }
    }

    /// The generic rejection for a missing capability.
    pub fn denied() -> Self {
        BelayError::AuthorizationDenied {
            reason: "access denied".into(),
        }
    }
}

pub type BelayResult<T> = Result<T, BelayError>;
