//! Read contract against the external directory store.
//!
//! The auth layer never owns persistence. It acquires a short-lived
//! [`DirectoryConnection`] from a [`Directory`] for the duration of a single
//! check and drops it before returning; the connection is released in its
//! `Drop` implementation, so early returns through `?` cannot leak it.
//!
//! Implementations may back this with a SQL pool, an HTTP API, or the
//! in-memory [`MemoryDirectory`](crate::MemoryDirectory).

use crate::error::StoreError;
use crate::types::{SecretKey, TeamRef};

/// Source of scoped directory connections.
pub trait Directory: Send + Sync {
    /// Acquire a connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unreachable or exhausted.
    fn connect(&self) -> Result<Box<dyn DirectoryConnection + '_>, StoreError>;
}

/// Queries the auth layer issues against the directory.
///
/// Every method is a single blocking lookup. Implementations release any
/// underlying resource when the connection is dropped.
pub trait DirectoryConnection {
    /// Secret key of the application called `name`, if registered.
    fn application_key(&mut self, name: &str) -> Result<Option<SecretKey>, StoreError>;

    /// Every registered application with its key.
    fn applications(&mut self) -> Result<Vec<(String, SecretKey)>, StoreError>;

    /// Anti-forgery tokens stored for `session_id`. A well-formed session has
    /// exactly one.
    fn csrf_tokens(&mut self, session_id: &str) -> Result<Vec<String>, StoreError>;

    /// Whether `user` carries the superuser flag.
    fn is_superuser(&mut self, user: &str) -> Result<bool, StoreError>;

    /// Whether `admin` is an admin of at least one team `user` belongs to.
    fn administers_user(&mut self, admin: &str, user: &str) -> Result<bool, StoreError>;

    /// Whether `user` is an admin of the team called `team`.
    fn is_team_admin(&mut self, team: &str, user: &str) -> Result<bool, StoreError>;

    /// Whether `user` is a member of `team`.
    fn is_team_member(&mut self, team: TeamRef<'_>, user: &str) -> Result<bool, StoreError>;
}
