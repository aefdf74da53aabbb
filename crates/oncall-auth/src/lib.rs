//! Caller authentication for Oncall.
//!
//! This crate answers "who is making this call" for two kinds of callers:
//!
//! - **Applications** sign each request with a shared secret using a
//!   time-windowed HMAC-SHA512 digest ([`digest`]). Secrets are resolved
//!   through a process-wide cache in front of the directory
//!   ([`credentials`]).
//! - **Users** present a session established by the login flow together with
//!   its anti-forgery token ([`session`]).
//!
//! The login flow itself lives outside this crate; [`backend`] defines the
//! contract its credential backends satisfy and the registry that selects one.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use oncall_auth::credentials::StaticCredentialProvider;
//! use oncall_auth::digest::{DigestAuthenticator, SignedRequest, sign_request};
//!
//! let provider = StaticCredentialProvider::new(vec![("svc-a".to_owned(), "K".to_owned())]);
//! let auth = DigestAuthenticator::new(Arc::new(provider));
//!
//! let request = SignedRequest::new("GET", "/widgets/42", "", b"");
//! let header = sign_request("svc-a", b"K", &request, 1_700_000_000);
//! assert!(auth.verify_at(&header, &request, 1_700_000_004).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`backend`] - Login backend contract and registry
//! - [`credentials`] - Application secret lookup and caching
//! - [`digest`] - HMAC request digest signing and verification
//! - [`session`] - Session and CSRF token verification

pub mod backend;
pub mod credentials;
pub mod digest;
pub mod session;

pub use backend::{Authenticator, AuthenticatorRegistry};
pub use credentials::{CredentialProvider, CredentialStore, StaticCredentialProvider};
pub use digest::{DigestAuthenticator, SignedRequest, sign_request};
pub use session::{CSRF_HEADER, SessionAuthenticator};
