//! SurrealDB implementation of [`SessionRepository`].
//!
//! Only the SHA-256 hash of a session token is ever stored; lookups go
//! through the unique `idx_session_token` index.

use belay_core::error::BelayResult;
use belay_core::models::session::{CreateSession, Session};
use belay_core::repository::SessionRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

const SELECT_SESSION: &str = "SELECT meta::id(id) AS record_id, * FROM session";

#[derive(Debug, SurrealValue)]
struct StoredSession {
    record_id: String,
    principal_id: String,
    token_hash: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoredSession> for Session {
    type Error = DbError;

    fn try_from(row: StoredSession) -> Result<Self, Self::Error> {
        Ok(Session {
            id: parse_uuid(&row.record_id, "session")?,
            principal_id: parse_uuid(&row.principal_id, "principal")?,
            token_hash: row.token_hash,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

fn first_session(rows: Vec<StoredSession>, missing: &str) -> Result<Session, DbError> {
    match rows.into_iter().next() {
        Some(row) => row.try_into(),
        None => Err(DbError::NotFound {
            entity: "session".into(),
            id: missing.to_string(),
        }),
    }
}

/// Session store over any SurrealDB connection.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> BelayResult<Session> {
        let key = Uuid::new_v4().to_string();

        // Write and read back in one round trip; statement 1 is the SELECT.
        let response = self
            .db
            .query(
                "CREATE type::record('session', $key) CONTENT {
                    principal_id: $principal_id,
                    token_hash: $token_hash,
                    ip_address: $ip_address,
                    user_agent: $user_agent,
                    expires_at: $expires_at
                } RETURN NONE",
            )
            .query(format!("{SELECT_SESSION} WHERE id = type::record('session', $key)"))
            .bind(("key", key.clone()))
            .bind(("principal_id", input.principal_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut response = response
            .check()
            .map_err(|e| DbError::from_check("session", e))?;
        let rows: Vec<StoredSession> = response.take(1).map_err(DbError::from)?;
        Ok(first_session(rows, &key)?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> BelayResult<Session> {
        let mut response = self
            .db
            .query(format!("{SELECT_SESSION} WHERE token_hash = $hash LIMIT 1"))
            .bind(("hash", token_hash.to_owned()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StoredSession> = response.take(0).map_err(DbError::from)?;
        // Never echo the hash into an error message.
        Ok(first_session(rows, "token")?)
    }

    async fn invalidate(&self, id: Uuid) -> BelayResult<()> {
        self.db
            .query("DELETE type::record('session', $key)")
            .bind(("key", id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn invalidate_principal_sessions(&self, principal_id: Uuid) -> BelayResult<()> {
        self.db
            .query("DELETE session WHERE principal_id = $principal")
            .bind(("principal", principal_id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn cleanup_expired(&self) -> BelayResult<u64> {
        let now = Utc::now();
        let mut response = self
            .db
            .query("SELECT count() AS total FROM session WHERE expires_at < $now GROUP ALL")
            .query("DELETE session WHERE expires_at < $now")
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let counted: Vec<CountRow> = response.take(0).map_err(DbError::from)?;
        Ok(counted.first().map_or(0, |row| row.total))
    }
}
