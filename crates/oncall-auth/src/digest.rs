//! Time-windowed HMAC request digests for application callers.
//!
//! An application signs each request with its shared secret and sends
//!
//! ```text
//! AUTHORIZATION: hmac <app_name>:<digest>
//! ```
//!
//! where
//!
//! ```text
//! digest        = base64url(HMAC-SHA512(secret, string_to_sign))
//! string_to_sign = "<window> <METHOD> <path[?query]> <raw body>"
//! window         = floor(unix_seconds / 5)
//! ```
//!
//! The verifier accepts the current and the immediately preceding window, so a
//! captured request can be replayed for at most ten seconds. Digests are
//! compared in constant time.
//!
//! The main entry point is [`DigestAuthenticator::verify`].

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE as BASE64_URL;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use oncall_core::{AuthError, AuthResult, Caller};

use crate::credentials::CredentialProvider;

/// Scheme prefix of the `AUTHORIZATION` header.
pub const SIGNATURE_PREFIX: &str = "hmac ";

/// Width of a signing window in seconds.
pub const WINDOW_SECONDS: i64 = 5;

type HmacSha512 = Hmac<Sha512>;

/// The parts of a request covered by the digest.
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
    /// HTTP method, as sent (`GET`, `POST`, ...).
    pub method: &'a str,
    /// Raw request path.
    pub path: &'a str,
    /// Raw query string without the leading `?`; empty if none.
    pub query: &'a str,
    /// Raw request body.
    pub body: &'a [u8],
}

impl<'a> SignedRequest<'a> {
    /// Describe a request.
    #[must_use]
    pub fn new(method: &'a str, path: &'a str, query: &'a str, body: &'a [u8]) -> Self {
        Self {
            method,
            path,
            query,
            body,
        }
    }
}

/// Signing window containing `unix_seconds`.
#[must_use]
pub fn window_for(unix_seconds: i64) -> i64 {
    unix_seconds.div_euclid(WINDOW_SECONDS)
}

/// Path as covered by the digest: `path`, or `path?query` when a query exists.
///
/// Both sides must build this from the raw bytes on the wire; any
/// re-encoding breaks the digest.
#[must_use]
pub fn canonical_path(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_owned()
    } else {
        format!("{path}?{query}")
    }
}

/// Build the byte string that is signed for `window`.
///
/// # Examples
///
/// ```
/// use oncall_auth::digest::{SignedRequest, string_to_sign};
///
/// let request = SignedRequest::new("GET", "/widgets/42", "", b"");
/// assert_eq!(string_to_sign(7, &request), b"7 GET /widgets/42 ".to_vec());
/// ```
#[must_use]
pub fn string_to_sign(window: i64, request: &SignedRequest<'_>) -> Vec<u8> {
    let head = format!(
        "{window} {} {} ",
        request.method,
        canonical_path(request.path, request.query)
    );
    let mut data = Vec::with_capacity(head.len() + request.body.len());
    data.extend_from_slice(head.as_bytes());
    data.extend_from_slice(request.body);
    data
}

/// Compute the base64url digest of `request` for `window`.
#[must_use]
pub fn compute_digest(secret: &[u8], window: i64, request: &SignedRequest<'_>) -> String {
    let mut mac = HmacSha512::new_from_slice(secret).expect("HMAC can accept keys of any length");
    mac.update(&string_to_sign(window, request));
    BASE64_URL.encode(mac.finalize().into_bytes())
}

/// Format an `AUTHORIZATION` header value.
#[must_use]
pub fn authorization_header(app_name: &str, digest: &str) -> String {
    format!("{SIGNATURE_PREFIX}{app_name}:{digest}")
}

/// Sign `request` as of `unix_seconds` and return the `AUTHORIZATION` value.
///
/// # Examples
///
/// ```
/// use oncall_auth::digest::{SignedRequest, sign_request};
///
/// let request = SignedRequest::new("GET", "/widgets/42", "", b"");
/// let header = sign_request("svc-a", b"K", &request, 1_700_000_000);
/// assert!(header.starts_with("hmac svc-a:"));
/// ```
#[must_use]
pub fn sign_request(
    app_name: &str,
    secret: &[u8],
    request: &SignedRequest<'_>,
    unix_seconds: i64,
) -> String {
    let digest = compute_digest(secret, window_for(unix_seconds), request);
    authorization_header(app_name, &digest)
}

/// Split an `AUTHORIZATION` value into application name and digest.
///
/// # Errors
///
/// Returns [`AuthError::InvalidDigestFormat`] if the `hmac ` prefix or the
/// `:` separator is missing, or the application name is empty.
pub fn parse_signature_header(header: &str) -> AuthResult<(&str, &str)> {
    let credentials = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(AuthError::InvalidDigestFormat)?;
    let (app_name, digest) = credentials
        .split_once(':')
        .ok_or(AuthError::InvalidDigestFormat)?;
    if app_name.is_empty() {
        return Err(AuthError::InvalidDigestFormat);
    }
    Ok((app_name, digest))
}

/// Verifies HMAC-signed requests from applications.
#[derive(Clone)]
pub struct DigestAuthenticator {
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for DigestAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestAuthenticator")
            .field("credentials", &"...")
            .finish()
    }
}

impl DigestAuthenticator {
    /// Create an authenticator resolving secrets through `credentials`.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { credentials }
    }

    /// Verify a request against the wall clock.
    ///
    /// # Errors
    ///
    /// See [`DigestAuthenticator::verify_at`].
    pub fn verify(&self, header: &str, request: &SignedRequest<'_>) -> AuthResult<Caller> {
        self.verify_at(header, request, chrono::Utc::now().timestamp())
    }

    /// Verify a request as if the server clock read `unix_seconds`.
    ///
    /// This function:
    /// 1. Parses the `hmac <app>:<digest>` header
    /// 2. Resolves the application's secret
    /// 3. Computes the expected digest for the current and previous window
    /// 4. Compares both in constant time
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidDigestFormat`] for a malformed header,
    /// [`AuthError::ApplicationNotFound`] for an unknown application,
    /// [`AuthError::WrongDigest`] if neither window matches, and
    /// [`AuthError::Store`] if the secret could not be fetched.
    pub fn verify_at(
        &self,
        header: &str,
        request: &SignedRequest<'_>,
        unix_seconds: i64,
    ) -> AuthResult<Caller> {
        let (app_name, provided) = parse_signature_header(header)?;

        debug!(
            app_name,
            method = request.method,
            path = request.path,
            "verifying request digest"
        );

        let secret = self.credentials.secret_key(app_name).inspect_err(|e| {
            warn!(app_name, error = %e, "could not resolve application key");
        })?;

        let window = window_for(unix_seconds);
        let current = compute_digest(secret.expose(), window, request);
        let previous = compute_digest(secret.expose(), window - 1, request);

        let provided = provided.as_bytes();
        let matched = provided.ct_eq(current.as_bytes()) | provided.ct_eq(previous.as_bytes());

        if matched.into() {
            debug!(app_name, "digest verification succeeded");
            Ok(Caller::Application(app_name.to_owned()))
        } else {
            warn!(app_name, window, "digest mismatch");
            Err(AuthError::WrongDigest)
        }
    }
}
