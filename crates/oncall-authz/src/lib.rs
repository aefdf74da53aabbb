//! Authorization for Oncall.
//!
//! Once a request's caller is known, handlers ask an [`AuthPolicy`] whether
//! that caller may act on a given user or team. Superusers pass every check;
//! authenticated applications bypass them entirely.

pub mod policy;

pub use policy::{AuthPolicy, DirectoryPolicy, PermissivePolicy, policy_for};
