//! Database-specific error types and conversions.

use belay_core::error::BelayError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored value could not be decoded: {0}")]
    Conversion(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },
}

impl DbError {
    /// Classify a failed statement. Unique-index violations become
    /// `AlreadyExists`; everything else is a generic query failure.
    pub(crate) fn from_check(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::AlreadyExists {
                entity: entity.into(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for BelayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BelayError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => BelayError::AlreadyExists { entity },
            DbError::Hashing(msg) => BelayError::Crypto(msg),
            other => BelayError::Database(other.to_string()),
        }
    }
}
