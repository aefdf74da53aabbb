//! Configuration for the auth layer.
//!
//! Configuration is driven by environment variables. Both switches that relax
//! security (`AUTH_DEBUG`, `AUTH_DOCS`) default to off.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Login backend selected by configuration.
///
/// `Debug` and `Static` ship with the auth crates; the remaining kinds must be
/// registered by the embedding application before the registry can build them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticatorKind {
    /// Accepts any credentials. Development only.
    Debug,
    /// In-memory user/password table.
    #[default]
    Static,
    /// LDAP bind.
    Ldap,
    /// SAML single sign-on.
    Saml,
}

impl AuthenticatorKind {
    /// Configuration name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Static => "static",
            Self::Ldap => "ldap",
            Self::Saml => "saml",
        }
    }
}

impl fmt::Display for AuthenticatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthenticatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "static" => Ok(Self::Static),
            "ldap" => Ok(Self::Ldap),
            "saml" => Ok(Self::Saml),
            other => Err(format!("unknown authenticator: {other}")),
        }
    }
}

/// Auth layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Relax authentication for end-to-end testing: session failures fall
    /// back to `debug_user`, authorization checks always pass and
    /// superuser-only actions are open.
    pub debug: bool,
    /// Documentation generation mode: guards become pass-through.
    pub docs: bool,
    /// Login backend.
    pub authenticator: AuthenticatorKind,
    /// Identity assigned to unauthenticated sessions in debug mode.
    pub debug_user: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            debug: false,
            docs: false,
            authenticator: AuthenticatorKind::default(),
            debug_user: "test_user".to_owned(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self {
            debug: env_bool("AUTH_DEBUG", false),
            docs: env_bool("AUTH_DOCS", false),
            ..Self::default()
        };

        if let Ok(v) = env::var("AUTH_MODULE") {
            match v.parse() {
                Ok(kind) => config.authenticator = kind,
                Err(e) => warn!(error = %e, "ignoring AUTH_MODULE"),
            }
        }
        if let Ok(v) = env::var("AUTH_DEBUG_USER") {
            config.debug_user = v;
        }

        config
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
