//! Request authentication entry point.
//!
//! [`RequestGuard`] decides how a request is authenticated:
//!
//! ```text
//! AUTHORIZATION header present?
//!   yes -> DigestAuthenticator  (application caller)
//!   no  -> SessionAuthenticator (session from extensions + X-CSRF-TOKEN)
//! ```
//!
//! It is assembled once from [`AuthConfig`]; debug and docs behavior is fixed
//! at construction and never toggled afterwards.

use std::sync::Arc;

use tracing::{debug, info, warn};

use oncall_auth::credentials::CredentialStore;
use oncall_auth::digest::{DigestAuthenticator, SignedRequest};
use oncall_auth::session::{CSRF_HEADER, SessionAuthenticator};
use oncall_authz::{AuthPolicy, policy_for};
use oncall_core::{AuthConfig, AuthError, AuthResult, Caller, Directory, Session};

use crate::handler::{AdminOnly, Handler, LoginRequired};

/// Source of the current unix time in seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Authenticates requests and hands out enforcement wrappers.
pub struct RequestGuard {
    config: AuthConfig,
    clock: Clock,
    credentials: Arc<CredentialStore>,
    digest: DigestAuthenticator,
    session: SessionAuthenticator,
    policy: Arc<dyn AuthPolicy>,
}

impl std::fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGuard")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("session", &self.session)
            .field("policy", &"...")
            .field("clock", &"...")
            .finish()
    }
}

impl RequestGuard {
    /// Assemble a guard without touching the directory.
    #[must_use]
    pub fn new(config: AuthConfig, directory: Arc<dyn Directory>) -> Self {
        let credentials = Arc::new(CredentialStore::new(Arc::clone(&directory)));
        let digest = DigestAuthenticator::new(Arc::clone(&credentials) as _);

        let mut session = SessionAuthenticator::new(Arc::clone(&directory));
        if config.debug {
            warn!(user = %config.debug_user, "auth debug turned on");
            session = session.with_debug_fallback(config.debug_user.clone());
        }

        let policy = policy_for(&config, directory);

        Self {
            config,
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
            credentials,
            digest,
            session,
            policy,
        }
    }

    /// Assemble a guard and preload all application keys.
    ///
    /// In docs mode nothing is loaded, since no request is ever authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the applications could not be loaded.
    pub fn init(config: AuthConfig, directory: Arc<dyn Directory>) -> AuthResult<Self> {
        let guard = Self::new(config, directory);
        if guard.config.docs {
            info!("docs mode, skipping application preload");
        } else {
            guard.credentials.preload()?;
        }
        Ok(guard)
    }

    /// Replace the wall clock, e.g. to pin time in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The configuration this guard was built from.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The authorization policy handlers should consult.
    #[must_use]
    pub fn policy(&self) -> &dyn AuthPolicy {
        self.policy.as_ref()
    }

    /// The application key cache.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Authenticate a request against the guard's clock.
    ///
    /// # Errors
    ///
    /// See [`RequestGuard::authenticate_at`].
    pub fn authenticate(&self, parts: &http::request::Parts, body: &[u8]) -> AuthResult<Caller> {
        self.authenticate_at(parts, body, (self.clock)())
    }

    /// Authenticate a request as if the server clock read `unix_seconds`.
    ///
    /// # Errors
    ///
    /// Returns the digest errors for signed requests and the session errors
    /// otherwise; store failures surface as [`AuthError::Store`].
    pub fn authenticate_at(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        unix_seconds: i64,
    ) -> AuthResult<Caller> {
        match signature_header(parts)? {
            Some(header) => {
                self.digest
                    .verify_at(header, &signed_request(parts, body), unix_seconds)
            }
            None => self.authenticate_session(parts),
        }
    }

    fn authenticate_session(&self, parts: &http::request::Parts) -> AuthResult<Caller> {
        let session = parts.extensions.get::<Session>();
        let csrf = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok());
        debug!(has_session = session.is_some(), "authenticating session");
        self.session.verify(session, csrf)
    }

    /// Wrap `handler` so it only runs for authenticated callers.
    #[must_use]
    pub fn login_required<H: Handler>(self: &Arc<Self>, handler: H) -> LoginRequired<H> {
        LoginRequired::new(Arc::clone(self), handler)
    }

    /// Wrap `handler` so it is rejected unless superuser-only restrictions
    /// are disabled (debug or docs mode).
    #[must_use]
    pub fn admin_only<H: Handler>(&self, handler: H) -> AdminOnly<H> {
        AdminOnly::new(handler, !(self.config.debug || self.config.docs))
    }
}

/// The `AUTHORIZATION` header, if present and non-empty.
fn signature_header(parts: &http::request::Parts) -> AuthResult<Option<&str>> {
    match parts.headers.get(http::header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| AuthError::InvalidDigestFormat),
    }
}

fn signed_request<'a>(parts: &'a http::request::Parts, body: &'a [u8]) -> SignedRequest<'a> {
    SignedRequest::new(
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        body,
    )
}
