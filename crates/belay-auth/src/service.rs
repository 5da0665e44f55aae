//! Authentication service: login, session resolution and logout.

use belay_core::context::PrincipalContext;
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::session::CreateSession;
use belay_core::repository::{PrincipalRepository, SessionRepository};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Raw opaque session token (set as the client cookie, not stored).
    pub session_token: String,
    pub session_id: Uuid,
    pub principal_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<P: PrincipalRepository, S: SessionRepository> {
    principal_repo: P,
    session_repo: S,
    config: AuthConfig,
}

impl<P: PrincipalRepository, S: SessionRepository> AuthService<P, S> {
    pub fn new(principal_repo: P, session_repo: S, config: AuthConfig) -> Self {
        Self {
            principal_repo,
            session_repo,
            config,
        }
    }

    /// Authenticate with username or email + password and open a
    /// session.
    pub async fn login(&self, input: LoginInput) -> BelayResult<LoginOutput> {
        // Username first, then email.
        let principal = match self
            .principal_repo
            .get_by_username(&input.username_or_email)
            .await
        {
            Ok(p) => p,
            Err(BelayError::NotFound { .. }) => self
                .principal_repo
                .get_by_email(&input.username_or_email)
                .await
                .map_err(|e| match e {
                    BelayError::NotFound { .. } => AuthError::InvalidCredentials.into(),
                    other => other,
                })?,
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            &input.password,
            &principal.password_hash,
            self.config.pepper.as_deref(),
        )?;

        // A deactivated account gets the same answer as a wrong password.
        if !valid || !principal.is_active() {
            debug!(principal_id = %principal.id, "Login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        let raw_token = token::generate_session_token();
        let expires_at = Utc::now() + self.config.session_lifetime()?;

        let session = self
            .session_repo
            .create(CreateSession {
                principal_id: principal.id,
                token_hash: token::hash_session_token(&raw_token),
                ip_address: input.ip_address,
                user_agent: input.user_agent,
                expires_at,
            })
            .await?;

        info!(
            principal_id = %principal.id,
            session_id = %session.id,
            "Principal logged in"
        );

        Ok(LoginOutput {
            session_token: raw_token,
            session_id: session.id,
            principal_id: principal.id,
            expires_at,
        })
    }

    /// Map a raw session token to the caller's context. The tenant comes
    /// from the stored principal, never from the request.
    pub async fn resolve(&self, raw_token: &str) -> BelayResult<PrincipalContext> {
        let token_hash = token::hash_session_token(raw_token);
        let session = self
            .session_repo
            .get_by_token_hash(&token_hash)
            .await
            .map_err(|e| match e {
                BelayError::NotFound { .. } => AuthError::SessionInvalid.into(),
                other => other,
            })?;

        if session.expires_at <= Utc::now() {
            self.session_repo.invalidate(session.id).await?;
            return Err(AuthError::SessionExpired.into());
        }

        let principal = match self.principal_repo.get_by_id(session.principal_id).await {
            Ok(p) => p,
            Err(BelayError::NotFound { .. }) => return Err(AuthError::SessionInvalid.into()),
            Err(e) => return Err(e),
        };

        if !principal.is_active() {
            self.session_repo
                .invalidate_principal_sessions(principal.id)
                .await?;
            return Err(AuthError::SessionInvalid.into());
        }

        Ok(PrincipalContext::from_principal(&principal, Some(session.id)))
    }

    /// Invalidate a single session (logout).
    pub async fn logout(&self, session_id: Uuid) -> BelayResult<()> {
        self.session_repo.invalidate(session_id).await
    }

    /// Revoke all sessions for a principal (e.g. on password change).
    pub async fn revoke_all_sessions(&self, principal_id: Uuid) -> BelayResult<()> {
        self.session_repo
            .invalidate_principal_sessions(principal_id)
            .await
    }

    /// Delete expired sessions, returning how many were removed.
    pub async fn cleanup_expired(&self) -> BelayResult<u64> {
        self.session_repo.cleanup_expired().await
    }
}
