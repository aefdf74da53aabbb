//! Authorization policies.
//!
//! [`AuthPolicy`] answers whether an authenticated [`Caller`] may act on a
//! user or a team. Two implementations exist:
//!
//! ```text
//! AuthPolicy
//!   ├── DirectoryPolicy   <- production, backed by the directory
//!   └── PermissivePolicy  <- debug mode, allows everything
//! ```
//!
//! Every check follows the same shape: an application caller is allowed
//! without any lookup; otherwise the specific relation is checked first and
//! the superuser flag only if that fails. Both lookups share one connection,
//! released before the decision is returned.

use std::sync::Arc;

use tracing::{debug, warn};

use oncall_core::{AuthConfig, AuthError, AuthResult, Caller, Directory, TeamRef};

/// Authorization checks run by handlers after authentication.
pub trait AuthPolicy: Send + Sync {
    /// Allow `caller` to act on user `target`: the caller is `target`, an
    /// admin of a team `target` belongs to, or a superuser.
    fn check_user(&self, target: &str, caller: &Caller) -> AuthResult<()>;

    /// Allow `caller` to administer `team`: an admin of it, or a superuser.
    fn check_team_admin(&self, team: &str, caller: &Caller) -> AuthResult<()>;

    /// Allow `caller` to act within the team named `team`: a member, or a
    /// superuser.
    fn check_team_member(&self, team: &str, caller: &Caller) -> AuthResult<()>;

    /// Same as [`AuthPolicy::check_team_member`], addressing the team by id.
    fn check_team_member_by_id(&self, team_id: u64, caller: &Caller) -> AuthResult<()>;

    /// Check that `user`, on whose behalf `caller` acts, is a member of
    /// `team` or a superuser. Application callers are still allowed outright.
    fn check_team_member_as(&self, team: &str, caller: &Caller, user: &str) -> AuthResult<()>;
}

/// Production policy backed by the team directory.
#[derive(Clone)]
pub struct DirectoryPolicy {
    directory: Arc<dyn Directory>,
}

impl std::fmt::Debug for DirectoryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryPolicy")
            .field("directory", &"...")
            .finish()
    }
}

impl DirectoryPolicy {
    /// Create a policy reading from `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    fn member_check(&self, team: TeamRef<'_>, user: &str) -> AuthResult<()> {
        let allowed = {
            let mut conn = self.directory.connect()?;
            conn.is_team_member(team, user)? || conn.is_superuser(user)?
        };
        if allowed {
            return Ok(());
        }

        warn!(user, %team, "team membership check failed");
        Err(match team {
            TeamRef::Name(name) => AuthError::forbidden(format!(
                "Action not allowed: \"{user}\" is not part of \"{name}\""
            )),
            TeamRef::Id(_) => AuthError::forbidden(format!(
                "Action not allowed: \"{user}\" is not a team member"
            )),
        })
    }
}

/// Unwrap the user name of a caller; applications bypass every check.
fn human(caller: &Caller) -> Option<&str> {
    match caller {
        Caller::User(name) => Some(name),
        Caller::Application(app) => {
            debug!(app_name = %app, "application caller bypasses authorization");
            None
        }
    }
}

impl AuthPolicy for DirectoryPolicy {
    fn check_user(&self, target: &str, caller: &Caller) -> AuthResult<()> {
        let Some(user) = human(caller) else {
            return Ok(());
        };
        if user == target {
            return Ok(());
        }

        let allowed = {
            let mut conn = self.directory.connect()?;
            conn.administers_user(user, target)? || conn.is_superuser(user)?
        };
        if allowed {
            return Ok(());
        }

        warn!(user, target, "user check failed");
        Err(AuthError::forbidden(format!(
            "Action not allowed for \"{user}\""
        )))
    }

    fn check_team_admin(&self, team: &str, caller: &Caller) -> AuthResult<()> {
        let Some(user) = human(caller) else {
            return Ok(());
        };

        let allowed = {
            let mut conn = self.directory.connect()?;
            conn.is_team_admin(team, user)? || conn.is_superuser(user)?
        };
        if allowed {
            return Ok(());
        }

        warn!(user, team, "team admin check failed");
        Err(AuthError::forbidden(format!(
            "Action not allowed: \"{user}\" is not an admin for \"{team}\""
        )))
    }

    fn check_team_member(&self, team: &str, caller: &Caller) -> AuthResult<()> {
        match human(caller) {
            Some(user) => self.member_check(TeamRef::Name(team), user),
            None => Ok(()),
        }
    }

    fn check_team_member_by_id(&self, team_id: u64, caller: &Caller) -> AuthResult<()> {
        match human(caller) {
            Some(user) => self.member_check(TeamRef::Id(team_id), user),
            None => Ok(()),
        }
    }

    fn check_team_member_as(&self, team: &str, caller: &Caller, user: &str) -> AuthResult<()> {
        match human(caller) {
            Some(_) => self.member_check(TeamRef::Name(team), user),
            None => Ok(()),
        }
    }
}

/// Allows everything. Selected only when debug mode is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissivePolicy;

impl AuthPolicy for PermissivePolicy {
    fn check_user(&self, _target: &str, _caller: &Caller) -> AuthResult<()> {
        Ok(())
    }

    fn check_team_admin(&self, _team: &str, _caller: &Caller) -> AuthResult<()> {
        Ok(())
    }

    fn check_team_member(&self, _team: &str, _caller: &Caller) -> AuthResult<()> {
        Ok(())
    }

    fn check_team_member_by_id(&self, _team_id: u64, _caller: &Caller) -> AuthResult<()> {
        Ok(())
    }

    fn check_team_member_as(&self, _team: &str, _caller: &Caller, _user: &str) -> AuthResult<()> {
        Ok(())
    }
}

/// Select the policy for `config`, once, at construction time.
#[must_use]
pub fn policy_for(config: &AuthConfig, directory: Arc<dyn Directory>) -> Arc<dyn AuthPolicy> {
    if config.debug {
        warn!("auth debug turned on, authorization checks disabled");
        Arc::new(PermissivePolicy)
    } else {
        Arc::new(DirectoryPolicy::new(directory))
    }
}
