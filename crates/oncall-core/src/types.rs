//! Identity types shared across the auth crates.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretSlice};

/// A resolved caller.
///
/// Produced by authentication and attached to the request extensions so that
/// downstream handlers can run authorization checks against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Caller {
    /// A human operator authenticated through a session.
    User(String),
    /// A registered application authenticated through an HMAC digest.
    Application(String),
}

impl Caller {
    /// The identity name, whatever the caller kind.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(name) | Self::Application(name) => name,
        }
    }

    /// Whether this caller authenticated as an application.
    #[must_use]
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A login session, as exposed by the external session layer.
///
/// The session middleware inserts it into the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Session identifier used to look up the anti-forgery token.
    pub id: String,
    /// Logged-in user, if any.
    pub user: Option<String>,
}

impl Session {
    /// Create a session for a logged-in user.
    #[must_use]
    pub fn new(id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user: Some(user.into()),
        }
    }

    /// Create a session with no user attached.
    #[must_use]
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user: None,
        }
    }
}

/// A team, addressed either by name or by numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamRef<'a> {
    /// Team name.
    Name(&'a str),
    /// Team primary key.
    Id(u64),
}

impl fmt::Display for TeamRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "#{id}"),
        }
    }
}

/// Shared secret of a registered application.
///
/// Cheap to clone; the bytes are only reachable through [`SecretKey::expose`]
/// and are redacted from `Debug` output.
#[derive(Clone)]
pub struct SecretKey(Arc<SecretSlice<u8>>);

impl SecretKey {
    /// Wrap raw key material.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(SecretSlice::from(bytes.into())))
    }

    /// Borrow the raw key bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}
