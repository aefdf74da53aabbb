//! Core types, configuration, and store contracts for Oncall auth.
//!
//! This crate provides the building blocks shared by the authentication,
//! authorization, and HTTP guard crates: the caller and session types, the
//! [`AuthError`] model, the [`Directory`] read contract against the external
//! store, and an in-memory [`MemoryDirectory`] for tests and development.

mod config;
mod error;
mod memory;
mod store;
mod types;

pub use config::{AuthConfig, AuthenticatorKind};
pub use error::{AuthError, AuthResult, ErrorKind, StoreError};
pub use memory::MemoryDirectory;
pub use store::{Directory, DirectoryConnection};
pub use types::{Caller, SecretKey, Session, TeamRef};
