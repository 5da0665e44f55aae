//! Request authentication: the `belay_session` cookie becomes a
//! [`PrincipalContext`].

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use belay_core::context::PrincipalContext;
use belay_core::error::BelayError;
use uuid::Uuid;

use crate::error::HttpError;
use crate::state::{AppState, CookieSettings};

pub const SESSION_COOKIE: &str = "belay_session";

/// Company a superuser acts in for one request. Ignored for everyone
/// else, whose tenant always comes from the stored principal.
pub const TENANT_HEADER: &str = "x-belay-tenant";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Caller(pub PrincipalContext);

impl FromRequestParts<AppState> for Caller {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or_else(|| {
            HttpError(BelayError::AuthenticationFailed {
                reason: "missing session".into(),
            })
        })?;
        let mut ctx = state.auth.resolve(&token).await?;

        if ctx.is_superuser() {
            if let Some(raw) = parts.headers.get(TENANT_HEADER) {
                let tenant = raw
                    .to_str()
                    .ok()
                    .and_then(|v| Uuid::parse_str(v.trim()).ok())
                    .ok_or_else(|| {
                        HttpError(BelayError::Validation {
                            message: format!("{TENANT_HEADER} must be a company id"),
                        })
                    })?;
                ctx.tenant_id = Some(tenant);
            }
        }

        Ok(Caller(ctx))
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, settings: &CookieSettings) -> Option<HeaderValue> {
    let secure = if settings.secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{secure}",
        settings.max_age_secs
    ))
    .ok()
}

/// `Set-Cookie` value that deletes the session cookie.
pub fn cleared_cookie() -> HeaderValue {
    HeaderValue::from_static("belay_session=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; belay_session=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn empty_or_missing_cookie_is_none() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("belay_session="));
        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn cookie_attributes() {
        let value = session_cookie(
            "tok",
            &CookieSettings {
                secure: true,
                max_age_secs: 60,
            },
        )
        .unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("belay_session=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=60"));
        assert!(value.ends_with("; Secure"));
    }
}
