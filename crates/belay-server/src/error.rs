//! HTTP rendering of [`BelayError`].
//!
//! Handlers return `Result<_, HttpError>`; `?` converts any `BelayError`.
//! Scope violations already arrive as `NotFound`, so a record in another
//! company and a missing record produce byte-identical responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use belay_core::error::BelayError;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable code.
    pub code: &'static str,
    /// Whether the same request may succeed with different input.
    pub recoverable: bool,
}

#[derive(Debug)]
pub struct HttpError(pub BelayError);

impl From<BelayError> for HttpError {
    fn from(err: BelayError) -> Self {
        HttpError(err)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError(BelayError::Validation {
            message: format!("invalid request body: {}", rejection.body_text()),
        })
    }
}

impl HttpError {
    fn parts(&self) -> (StatusCode, &'static str, String, bool) {
        match &self.0 {
            BelayError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "not found".into(), false)
            }
            BelayError::AlreadyExists { entity } => (
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
                format!("{entity} already exists"),
                true,
            ),
            BelayError::AuthenticationFailed { reason } => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                reason.clone(),
                true,
            ),
            BelayError::AuthorizationDenied { .. } => (
                StatusCode::FORBIDDEN,
                "ACCESS_DENIED",
                "access denied".into(),
                false,
            ),
            BelayError::Validation { message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION",
                message.clone(),
                true,
            ),
            BelayError::InvalidLinkingCode => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_LINKING_CODE",
                "invalid linking code".into(),
                true,
            ),
            BelayError::TenantContext => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TENANT_CONTEXT",
                "no company selected for this request".into(),
                true,
            ),
            BelayError::Database(_) | BelayError::Crypto(_) | BelayError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "internal server error".into(),
                false,
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, code, error, recoverable) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, code, "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error,
                code,
                recoverable,
            }),
        )
            .into_response()
    }
}

/// `Json<T>` whose rejection renders as an [`ErrorResponse`].
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpError::from)?;
        Ok(ValidatedJson(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: BelayError) -> StatusCode {
        HttpError(err).into_response().status()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_of(BelayError::hidden("project")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(BelayError::denied()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(BelayError::AuthenticationFailed {
                reason: "invalid credentials".into()
            }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(BelayError::InvalidLinkingCode),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(BelayError::AlreadyExists {
                entity: "principal".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(BelayError::Database("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_hides_the_entity() {
        let hidden = HttpError(BelayError::hidden("project")).parts();
        let missing = HttpError(BelayError::NotFound {
            entity: "project".into(),
            id: "1234".into(),
        })
        .parts();
        assert_eq!(hidden.2, missing.2);
        assert_eq!(hidden.2, "not found");
    }
}
