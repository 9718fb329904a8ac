//! Auth Error Types
//!
//! Every variant carries a stable machine-readable code (`code()`) that
//! survives into the JSON body, so clients branch on codes and never on
//! message text. Provider-originated failures arrive here already
//! normalized (see `application::error_normalizer`).

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::application::error_normalizer::NormalizedError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    // ------------------------------------------------------------------
    // Session issuing
    // ------------------------------------------------------------------
    /// Provider account exists but its email is not verified yet
    #[error("{message}")]
    EmailNotVerified { message: Cow<'static, str> },

    /// Normalized provider rejection (credentials, weak password, ...)
    #[error("{}", .0.message)]
    Provider(NormalizedError),

    /// Email already belongs to a local user with a different provider UID
    #[error("Account is linked to a different identity")]
    IdentityConflict,

    /// Local unique email constraint hit
    #[error("Email address is already registered")]
    EmailExists,

    #[error("Refresh token is required")]
    MissingRefreshToken,

    #[error("Refresh token is invalid or expired")]
    InvalidRefreshToken,

    // ------------------------------------------------------------------
    // Request authentication
    // ------------------------------------------------------------------
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Session is invalid")]
    InvalidSession,

    /// Idle longer than the application allows
    #[error("Session expired due to inactivity")]
    SessionExpired,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Group id header is missing or invalid")]
    InvalidGroupId,

    // ------------------------------------------------------------------
    // Invites
    // ------------------------------------------------------------------
    #[error("Invite token is invalid")]
    InvalidToken,

    #[error("Invite has already been used")]
    AlreadyUsed,

    #[error("Invite has expired")]
    Expired,

    #[error("Invite was issued to a different email address")]
    EmailMismatch,

    #[error("Already a member of this group")]
    AlreadyMember,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invite notification could not be delivered")]
    NotificationFailed(String),

    // ------------------------------------------------------------------
    // Infrastructure
    // ------------------------------------------------------------------
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Timeout, connection failure, or unintelligible provider answer
    #[error("Identity provider is unavailable")]
    ProviderUnavailable(String),

    /// Service credentials missing or unusable
    #[error("Identity provider is misconfigured")]
    ProviderMisconfigured(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code
    pub fn code(&self) -> &str {
        match self {
            AuthError::EmailNotVerified { .. } => "EMAIL_NOT_VERIFIED",
            AuthError::Provider(normalized) => normalized.code.as_ref(),
            AuthError::IdentityConflict => "IDENTITY_CONFLICT",
            AuthError::EmailExists => "EMAIL_EXISTS",
            AuthError::MissingRefreshToken => "MISSING_REFRESH_TOKEN",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::InvalidSession => "INVALID_SESSION",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::InvalidGroupId => "INVALID_GROUP",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::AlreadyUsed => "ALREADY_USED",
            AuthError::Expired => "EXPIRED",
            AuthError::EmailMismatch => "EMAIL_MISMATCH",
            AuthError::AlreadyMember => "ALREADY_MEMBER",
            AuthError::InvalidRole(_) => "INVALID_ROLE",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::NotificationFailed(_) => "NOTIFICATION_FAILED",
            AuthError::Validation(_) => "VALIDATION_FAILED",
            AuthError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            AuthError::ProviderMisconfigured(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                "INTERNAL"
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Provider(normalized) => normalized.kind,
            AuthError::EmailNotVerified { .. } | AuthError::Forbidden | AuthError::EmailMismatch => {
                ErrorKind::Forbidden
            }
            AuthError::IdentityConflict
            | AuthError::EmailExists
            | AuthError::AlreadyUsed
            | AuthError::AlreadyMember => ErrorKind::Conflict,
            AuthError::MissingRefreshToken
            | AuthError::InvalidGroupId
            | AuthError::InvalidRole(_)
            | AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::InvalidRefreshToken
            | AuthError::Unauthenticated
            | AuthError::InvalidSession
            | AuthError::SessionExpired => ErrorKind::Unauthorized,
            AuthError::InvalidToken | AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::Expired => ErrorKind::Gone,
            AuthError::NotificationFailed(_) => ErrorKind::BadGateway,
            AuthError::ProviderUnavailable(_) => ErrorKind::ServiceUnavailable,
            AuthError::ProviderMisconfigured(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Convert to AppError
    ///
    /// Internal details (SQL errors, provider payloads) never reach the body.
    pub fn to_app_error(&self) -> AppError {
        let message: Cow<'static, str> = match self {
            AuthError::Database(_) | AuthError::Internal(_) | AuthError::ProviderMisconfigured(_) => {
                "Internal server error".into()
            }
            AuthError::NotificationFailed(_) => {
                "Invite notification could not be delivered".into()
            }
            AuthError::ProviderUnavailable(_) => "Identity provider is unavailable".into(),
            other => other.to_string().into(),
        };

        AppError::new(self.kind(), message).with_code(self.code().to_string())
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::ProviderMisconfigured(msg) => {
                tracing::error!(message = %msg, "Identity provider misconfigured");
            }
            AuthError::ProviderUnavailable(msg) => {
                tracing::warn!(message = %msg, "Identity provider unavailable");
            }
            AuthError::NotificationFailed(msg) => {
                tracing::warn!(message = %msg, "Invite notification failed");
            }
            AuthError::IdentityConflict => {
                tracing::warn!("Sign-in blocked by identity conflict");
            }
            AuthError::EmailMismatch => {
                tracing::warn!("Invite consumption attempted by a different account");
            }
            _ => {
                tracing::debug!(code = self.code(), error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_errors_have_distinct_codes() {
        let codes = [
            AuthError::InvalidToken.code(),
            AuthError::AlreadyUsed.code(),
            AuthError::Expired.code(),
            AuthError::EmailMismatch.code(),
            AuthError::AlreadyMember.code(),
        ];
        assert_eq!(
            codes,
            ["INVALID_TOKEN", "ALREADY_USED", "EXPIRED", "EMAIL_MISMATCH", "ALREADY_MEMBER"]
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AuthError::Internal("connection string postgres://secret".into());
        let app = err.to_app_error();
        assert_eq!(app.status_code(), 500);
        assert_eq!(app.code(), Some("INTERNAL"));
        assert!(!app.message().contains("secret"));
    }

    #[test]
    fn test_session_errors_are_401() {
        for err in [
            AuthError::Unauthenticated,
            AuthError::InvalidSession,
            AuthError::SessionExpired,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }
}
