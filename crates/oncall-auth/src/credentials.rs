//! Application credential lookup.
//!
//! This module defines the [`CredentialProvider`] trait for resolving an
//! application's shared secret from its name, the directory-backed
//! [`CredentialStore`] used in production, and a [`StaticCredentialProvider`]
//! for tests.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use oncall_core::{AuthError, AuthResult, Directory, SecretKey};

/// Trait for looking up application secrets by application name.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the shared secret for `app_name`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ApplicationNotFound`] if the application is not
    /// registered, or [`AuthError::Store`] if the lookup itself failed.
    fn secret_key(&self, app_name: &str) -> AuthResult<SecretKey>;
}

/// Process-wide cache of application secrets in front of the directory.
///
/// Hits are served from a sharded concurrent map and never block each other.
/// A miss performs one directory lookup; a found key is cached for the rest
/// of the process lifetime, an unknown application is not cached so a later
/// registration is picked up without a restart. The map lock is never held
/// across the directory call.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use oncall_auth::credentials::{CredentialProvider, CredentialStore};
/// use oncall_core::MemoryDirectory;
///
/// let directory = Arc::new(MemoryDirectory::new());
/// directory.register_application("svc-a", "key");
///
/// let store = CredentialStore::new(directory);
/// assert_eq!(store.preload().unwrap(), 1);
/// assert_eq!(store.secret_key("svc-a").unwrap().expose(), b"key");
/// ```
pub struct CredentialStore {
    directory: Arc<dyn Directory>,
    keys: DashMap<String, SecretKey>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("directory", &"...")
            .field("cached", &self.keys.len())
            .finish()
    }
}

impl CredentialStore {
    /// Create an empty store backed by `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            keys: DashMap::new(),
        }
    }

    /// Load every registered application into the cache.
    ///
    /// Returns the number of applications loaded; zero is not an error.
    pub fn preload(&self) -> AuthResult<usize> {
        let applications = {
            let mut conn = self.directory.connect()?;
            conn.applications()?
        };

        let count = applications.len();
        for (name, key) in applications {
            self.keys.insert(name, key);
        }

        info!(
            count,
            applications = ?self.keys.iter().map(|e| e.key().clone()).collect::<Vec<_>>(),
            "loaded applications"
        );
        Ok(count)
    }

    /// Resolve the secret of `app_name`, consulting the directory on a miss.
    pub fn get(&self, app_name: &str) -> AuthResult<SecretKey> {
        if let Some(key) = self.keys.get(app_name).map(|entry| entry.value().clone()) {
            return Ok(key);
        }

        debug!(app_name, "application key cache miss");
        let fetched = {
            let mut conn = self.directory.connect()?;
            conn.application_key(app_name)?
        };

        match fetched {
            Some(key) => {
                self.keys.insert(app_name.to_owned(), key.clone());
                Ok(key)
            }
            None => Err(AuthError::ApplicationNotFound(app_name.to_owned())),
        }
    }

    /// Whether `app_name` is currently cached.
    #[must_use]
    pub fn contains(&self, app_name: &str) -> bool {
        self.keys.contains_key(app_name)
    }

    /// Drop the cached key of `app_name` so the next lookup refetches it.
    pub fn invalidate(&self, app_name: &str) -> bool {
        self.keys.remove(app_name).is_some()
    }

    /// Drop every cached key.
    pub fn clear(&self) {
        self.keys.clear();
    }

    /// Number of cached applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl CredentialProvider for CredentialStore {
    fn secret_key(&self, app_name: &str) -> AuthResult<SecretKey> {
        self.get(app_name)
    }
}

/// A fixed in-memory credential provider.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, SecretKey>,
}

impl StaticCredentialProvider {
    /// Create a provider from (app_name, secret) pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|(name, key)| (name, SecretKey::from(key)))
                .collect(),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn secret_key(&self, app_name: &str) -> AuthResult<SecretKey> {
        self.credentials
            .get(app_name)
            .cloned()
            .ok_or_else(|| AuthError::ApplicationNotFound(app_name.to_owned()))
    }
}
