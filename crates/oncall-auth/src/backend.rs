//! Login backends.
//!
//! The login flow that establishes sessions delegates credential checks to an
//! [`Authenticator`]. Which one is used is decided once, from
//! [`AuthConfig::authenticator`], through an [`AuthenticatorRegistry`]. The
//! registry ships with the `Debug` and `Static` backends; SSO-style backends
//! are registered by the embedding application.

use std::collections::HashMap;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{info, warn};

use oncall_core::{AuthConfig, AuthError, AuthResult, AuthenticatorKind, SecretKey};

/// Contract every login backend satisfies.
pub trait Authenticator: Send + Sync {
    /// The configuration kind this backend answers to.
    fn kind(&self) -> AuthenticatorKind;

    /// Check `password` for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on rejection, or
    /// [`AuthError::Store`] if the backend could not be reached.
    fn authenticate(&self, username: &str, password: &str) -> AuthResult<()>;
}

/// Accepts every login. Only buildable in debug mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugAuthenticator;

impl Authenticator for DebugAuthenticator {
    fn kind(&self) -> AuthenticatorKind {
        AuthenticatorKind::Debug
    }

    fn authenticate(&self, username: &str, _password: &str) -> AuthResult<()> {
        warn!(username, "debug authenticator accepted login");
        Ok(())
    }
}

/// Checks logins against a fixed user/password table.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, SecretKey>,
}

impl StaticAuthenticator {
    /// Create a backend from (username, password) pairs.
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|(user, password)| (user, SecretKey::from(password)))
                .collect(),
        }
    }
}

impl Authenticator for StaticAuthenticator {
    fn kind(&self) -> AuthenticatorKind {
        AuthenticatorKind::Static
    }

    fn authenticate(&self, username: &str, password: &str) -> AuthResult<()> {
        let Some(expected) = self.users.get(username) else {
            return Err(AuthError::InvalidCredentials);
        };
        if expected.expose().ct_eq(password.as_bytes()).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Builds a backend from configuration.
pub type AuthenticatorFactory =
    Box<dyn Fn(&AuthConfig) -> AuthResult<Arc<dyn Authenticator>> + Send + Sync>;

/// Registry of login backends keyed by [`AuthenticatorKind`].
pub struct AuthenticatorRegistry {
    factories: HashMap<AuthenticatorKind, AuthenticatorFactory>,
}

impl std::fmt::Debug for AuthenticatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for AuthenticatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl AuthenticatorRegistry {
    /// A registry with no backends.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the `Debug` backend and an empty `Static` table.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(AuthenticatorKind::Debug, |config| {
            if config.debug {
                Ok(Arc::new(DebugAuthenticator) as Arc<dyn Authenticator>)
            } else {
                Err(AuthError::Config(
                    "debug authenticator requires debug mode".to_owned(),
                ))
            }
        });
        registry.register(AuthenticatorKind::Static, |_| {
            Ok(Arc::new(StaticAuthenticator::default()) as Arc<dyn Authenticator>)
        });
        registry
    }

    /// Register or replace the factory for `kind`.
    pub fn register<F>(&mut self, kind: AuthenticatorKind, factory: F)
    where
        F: Fn(&AuthConfig) -> AuthResult<Arc<dyn Authenticator>> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    /// Whether a factory is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: AuthenticatorKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Build the backend selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if no factory is registered for the
    /// configured kind, or whatever the factory itself reports.
    pub fn build(&self, config: &AuthConfig) -> AuthResult<Arc<dyn Authenticator>> {
        let kind = config.authenticator;
        let factory = self.factories.get(&kind).ok_or_else(|| {
            AuthError::Config(format!("no authenticator registered for {kind}"))
        })?;
        let authenticator = factory(config)?;
        info!(%kind, "login authenticator ready");
        Ok(authenticator)
    }
}
