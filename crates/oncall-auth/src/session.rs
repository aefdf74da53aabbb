//! Session authentication for human callers.
//!
//! A session is established by the external login flow. Each request must
//! carry the session's anti-forgery token in the `X-CSRF-TOKEN` header; the
//! token stored for the session id must match it exactly.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use oncall_core::{AuthError, AuthResult, Caller, Directory, ErrorKind, Session};

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Verifies session-authenticated requests.
#[derive(Clone)]
pub struct SessionAuthenticator {
    directory: Arc<dyn Directory>,
    fallback_user: Option<String>,
}

impl std::fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("directory", &"...")
            .field("fallback_user", &self.fallback_user)
            .finish()
    }
}

impl SessionAuthenticator {
    /// Create a strict authenticator.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            fallback_user: None,
        }
    }

    /// Resolve unauthenticated sessions to `user` instead of failing.
    ///
    /// For end-to-end test environments only. Store failures are still
    /// reported.
    #[must_use]
    pub fn with_debug_fallback(mut self, user: impl Into<String>) -> Self {
        self.fallback_user = Some(user.into());
        self
    }

    /// Whether a debug fallback identity is configured.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.fallback_user.is_some()
    }

    /// Verify `session` against the token sent in `csrf_header`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotLoggedIn`] if there is no logged-in user,
    /// [`AuthError::CsrfTokenMissing`] unless exactly one token is stored for
    /// the session, [`AuthError::CsrfValidationFailed`] if the header is
    /// absent, empty, or different, and [`AuthError::Store`] if the lookup
    /// failed.
    pub fn verify(
        &self,
        session: Option<&Session>,
        csrf_header: Option<&str>,
    ) -> AuthResult<Caller> {
        match (self.verify_strict(session, csrf_header), &self.fallback_user) {
            (Err(e), Some(user)) if e.kind() == ErrorKind::Unauthenticated => {
                debug!(error = %e, user, "session rejected, using debug identity");
                Ok(Caller::User(user.clone()))
            }
            (result, _) => result,
        }
    }

    fn verify_strict(
        &self,
        session: Option<&Session>,
        csrf_header: Option<&str>,
    ) -> AuthResult<Caller> {
        let (session_id, user) = session
            .and_then(|s| s.user.as_deref().map(|user| (s.id.as_str(), user)))
            .ok_or(AuthError::NotLoggedIn)?;

        let tokens = {
            let mut conn = self.directory.connect()?;
            conn.csrf_tokens(session_id)?
        };

        let [token] = tokens.as_slice() else {
            warn!(user, rows = tokens.len(), "session has no unique CSRF token");
            return Err(AuthError::CsrfTokenMissing);
        };

        let matched = csrf_header.is_some_and(|sent| {
            !sent.is_empty() && bool::from(sent.as_bytes().ct_eq(token.as_bytes()))
        });
        if !matched {
            warn!(user, "CSRF validation failed");
            return Err(AuthError::CsrfValidationFailed);
        }

        debug!(user, "session verification succeeded");
        Ok(Caller::User(user.to_owned()))
    }
}
