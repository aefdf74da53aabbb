//! Error types shared by every Oncall auth crate.
//!
//! Every failure is an [`AuthError`]. Callers branch on [`AuthError::kind`]
//! rather than on individual variants: an [`ErrorKind::Unauthenticated`]
//! failure means the caller could not be identified, [`ErrorKind::Forbidden`]
//! means the caller was identified but lacks the right, and
//! [`ErrorKind::Unavailable`] means a dependency failed and nothing can be
//! said about the caller at all.

use http::StatusCode;

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller's identity could not be established (401).
    Unauthenticated,
    /// The caller is known but not allowed to perform the action (403).
    Forbidden,
    /// A backing store could not be reached (503).
    Unavailable,
    /// The auth layer itself is misconfigured (500).
    Internal,
}

/// Failures raised while talking to the external directory.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable or has no free connection.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The lookup did not finish in time.
    #[error("store lookup timed out")]
    Timeout,

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Authentication and authorization failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `AUTHORIZATION` header is not `hmac <app>:<digest>`.
    #[error("Invalid digest format")]
    InvalidDigestFormat,

    /// The signing application is not registered.
    #[error("Application not found")]
    ApplicationNotFound(String),

    /// The digest matched neither the current nor the previous window.
    #[error("Wrong digest")]
    WrongDigest,

    /// No session, or a session without a user.
    #[error("User must be logged in")]
    NotLoggedIn,

    /// The session has no stored anti-forgery token.
    #[error("CSRF token missing")]
    CsrfTokenMissing,

    /// The `X-CSRF-TOKEN` header does not match the stored token.
    #[error("CSRF validation failed")]
    CsrfValidationFailed,

    /// A login backend rejected the supplied credentials.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// An authorization check failed; the message names caller and resource.
    #[error("{0}")]
    Forbidden(String),

    /// The action is restricted to superusers.
    #[error("Admin only action")]
    AdminOnly,

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Misconfiguration detected while assembling the auth stack.
    #[error("configuration error: {0}")]
    Config(String),

    /// The auth layer failed for a reason unrelated to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Build a [`AuthError::Forbidden`] from any message.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDigestFormat
            | Self::ApplicationNotFound(_)
            | Self::WrongDigest
            | Self::NotLoggedIn
            | Self::CsrfTokenMissing
            | Self::CsrfValidationFailed
            | Self::InvalidCredentials => ErrorKind::Unauthenticated,
            Self::Forbidden(_) | Self::AdminOnly => ErrorKind::Forbidden,
            Self::Store(_) => ErrorKind::Unavailable,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The HTTP status this error surfaces as.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short title used in error response bodies.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidDigestFormat | Self::ApplicationNotFound(_) | Self::WrongDigest => {
                "Authentication failure"
            }
            Self::CsrfTokenMissing | Self::CsrfValidationFailed => "Invalid Session",
            Self::NotLoggedIn | Self::InvalidCredentials | Self::Forbidden(_) | Self::AdminOnly => {
                "Unauthorized"
            }
            Self::Store(_) => "Service Unavailable",
            Self::Config(_) | Self::Internal(_) => "Internal Server Error",
        }
    }
}

/// Convenience result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
