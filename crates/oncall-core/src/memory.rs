//! In-memory [`Directory`] implementation.
//!
//! Suitable for tests and local development. Connections are counted so that
//! callers can assert none are left open, and the directory can be switched
//! offline or made to fail queries to exercise infrastructure error paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::store::{Directory, DirectoryConnection};
use crate::types::{SecretKey, TeamRef};

#[derive(Debug, Default)]
struct TeamRecord {
    name: String,
    members: HashSet<String>,
    admins: HashSet<String>,
}

#[derive(Debug, Default)]
struct DirectoryData {
    applications: HashMap<String, SecretKey>,
    csrf_tokens: HashMap<String, Vec<String>>,
    superusers: HashSet<String>,
    teams: HashMap<u64, TeamRecord>,
    next_team_id: u64,
}

impl DirectoryData {
    fn team_by_name(&self, name: &str) -> Option<&TeamRecord> {
        self.teams.values().find(|t| t.name == name)
    }

    fn team_by_name_mut(&mut self, name: &str) -> Option<&mut TeamRecord> {
        self.teams.values_mut().find(|t| t.name == name)
    }
}

/// Thread-safe in-memory directory.
///
/// # Examples
///
/// ```
/// use oncall_core::{Directory, MemoryDirectory};
///
/// let directory = MemoryDirectory::new();
/// directory.add_team("sre");
/// directory.add_member("sre", "alice");
///
/// {
///     let mut conn = directory.connect().unwrap();
///     assert!(conn.is_team_member(oncall_core::TeamRef::Name("sre"), "alice").unwrap());
///     assert_eq!(directory.open_connections(), 1);
/// }
/// assert_eq!(directory.open_connections(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    data: RwLock<DirectoryData>,
    open: AtomicUsize,
    acquired: AtomicU64,
    max_connections: Option<usize>,
    offline: AtomicBool,
    failing: AtomicBool,
}

impl MemoryDirectory {
    /// Create an empty directory with unlimited connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of simultaneously open connections.
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Register (or replace) an application and its shared secret.
    pub fn register_application(&self, name: impl Into<String>, key: impl Into<SecretKey>) {
        self.data
            .write()
            .applications
            .insert(name.into(), key.into());
    }

    /// Remove an application.
    pub fn remove_application(&self, name: &str) {
        self.data.write().applications.remove(name);
    }

    /// Store the anti-forgery token of a session, replacing any previous one.
    pub fn set_csrf_token(&self, session_id: impl Into<String>, token: impl Into<String>) {
        self.data
            .write()
            .csrf_tokens
            .insert(session_id.into(), vec![token.into()]);
    }

    /// Append another token row to a session (a corrupted session table).
    pub fn push_csrf_token(&self, session_id: impl Into<String>, token: impl Into<String>) {
        self.data
            .write()
            .csrf_tokens
            .entry(session_id.into())
            .or_default()
            .push(token.into());
    }

    /// Set or clear the superuser flag of a user.
    pub fn set_superuser(&self, user: impl Into<String>, superuser: bool) {
        let user = user.into();
        let mut data = self.data.write();
        if superuser {
            data.superusers.insert(user);
        } else {
            data.superusers.remove(&user);
        }
    }

    /// Create a team and return its id. Existing teams keep their id.
    pub fn add_team(&self, name: impl Into<String>) -> u64 {
        let name = name.into();
        let mut data = self.data.write();
        if let Some((id, _)) = data.teams.iter().find(|(_, t)| t.name == name) {
            return *id;
        }
        data.next_team_id += 1;
        let id = data.next_team_id;
        data.teams.insert(
            id,
            TeamRecord {
                name,
                ..TeamRecord::default()
            },
        );
        id
    }

    /// Add a member to a team, creating the team if needed.
    pub fn add_member(&self, team: &str, user: impl Into<String>) {
        self.add_team(team);
        if let Some(record) = self.data.write().team_by_name_mut(team) {
            record.members.insert(user.into());
        }
    }

    /// Add an admin to a team. Admins are always members too.
    pub fn add_admin(&self, team: &str, user: impl Into<String>) {
        let user = user.into();
        self.add_team(team);
        if let Some(record) = self.data.write().team_by_name_mut(team) {
            record.members.insert(user.clone());
            record.admins.insert(user);
        }
    }

    /// Make `connect` fail as if the store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every query on an open connection fail with a timeout.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of connections currently held.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Number of connections handed out since creation.
    #[must_use]
    pub fn connections_acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }
}

impl Directory for MemoryDirectory {
    fn connect(&self) -> Result<Box<dyn DirectoryConnection + '_>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("directory offline".to_owned()));
        }

        let previous = self.open.fetch_add(1, Ordering::SeqCst);
        if self.max_connections.is_some_and(|max| previous >= max) {
            self.open.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(
                "connection pool exhausted".to_owned(),
            ));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemoryConnection { directory: self }))
    }
}

/// Connection handed out by [`MemoryDirectory`]; releases its slot on drop.
#[derive(Debug)]
struct MemoryConnection<'a> {
    directory: &'a MemoryDirectory,
}

impl MemoryConnection<'_> {
    fn check(&self) -> Result<(), StoreError> {
        if self.directory.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }
}

impl Drop for MemoryConnection<'_> {
    fn drop(&mut self) {
        self.directory.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DirectoryConnection for MemoryConnection<'_> {
    fn application_key(&mut self, name: &str) -> Result<Option<SecretKey>, StoreError> {
        self.check()?;
        Ok(self.directory.data.read().applications.get(name).cloned())
    }

    fn applications(&mut self) -> Result<Vec<(String, SecretKey)>, StoreError> {
        self.check()?;
        Ok(self
            .directory
            .data
            .read()
            .applications
            .iter()
            .map(|(name, key)| (name.clone(), key.clone()))
            .collect())
    }

    fn csrf_tokens(&mut self, session_id: &str) -> Result<Vec<String>, StoreError> {
        self.check()?;
        Ok(self
            .directory
            .data
            .read()
            .csrf_tokens
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    fn is_superuser(&mut self, user: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.directory.data.read().superusers.contains(user))
    }

    fn administers_user(&mut self, admin: &str, user: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self
            .directory
            .data
            .read()
            .teams
            .values()
            .any(|t| t.admins.contains(admin) && t.members.contains(user)))
    }

    fn is_team_admin(&mut self, team: &str, user: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self
            .directory
            .data
            .read()
            .team_by_name(team)
            .is_some_and(|t| t.admins.contains(user)))
    }

    fn is_team_member(&mut self, team: TeamRef<'_>, user: &str) -> Result<bool, StoreError> {
        self.check()?;
        let data = self.directory.data.read();
        let record = match team {
            TeamRef::Name(name) => data.team_by_name(name),
            TeamRef::Id(id) => data.teams.get(&id),
        };
        Ok(record.is_some_and(|t| t.members.contains(user)))
    }
}
