//! Handler trait and the authentication wrappers built on it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use oncall_core::{AuthError, AuthResult, Caller};

use crate::body::ResponseBody;
use crate::guard::RequestGuard;

/// Outcome of a handler invocation.
pub type HandlerResult = Result<http::Response<ResponseBody>, AuthError>;

/// Boxed future returned by [`Handler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// An endpoint that consumes a fully buffered request.
///
/// Authentication wrappers implement this trait themselves, so they compose:
/// `guard.admin_only(guard.login_required(handler))`.
pub trait Handler: Send + Sync + 'static {
    /// Handle a request and produce an HTTP response.
    fn call(&self, req: http::Request<Bytes>) -> HandlerFuture;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, req: http::Request<Bytes>) -> HandlerFuture {
        (**self).call(req)
    }
}

/// The authenticated caller of `req`.
///
/// Set by [`LoginRequired`] before the wrapped handler runs.
///
/// # Errors
///
/// Returns [`AuthError::NotLoggedIn`] if the request was never authenticated.
pub fn caller<B>(req: &http::Request<B>) -> AuthResult<&Caller> {
    req.extensions().get::<Caller>().ok_or(AuthError::NotLoggedIn)
}

fn reject(error: AuthError) -> HandlerFuture {
    Box::pin(std::future::ready(Err(error)))
}

/// Runs the inner handler only for authenticated callers.
///
/// Authentication talks to the directory through blocking calls, so it runs
/// on tokio's blocking pool. On success the [`Caller`] is stored in the
/// request extensions. In docs mode requests pass through untouched.
pub struct LoginRequired<H> {
    guard: Arc<RequestGuard>,
    inner: Arc<H>,
}

impl<H> std::fmt::Debug for LoginRequired<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequired")
            .field("guard", &self.guard)
            .field("inner", &"...")
            .finish()
    }
}

impl<H: Handler> LoginRequired<H> {
    /// Wrap `inner` with authentication through `guard`.
    #[must_use]
    pub fn new(guard: Arc<RequestGuard>, inner: H) -> Self {
        Self {
            guard,
            inner: Arc::new(inner),
        }
    }
}

impl<H: Handler> Handler for LoginRequired<H> {
    fn call(&self, req: http::Request<Bytes>) -> HandlerFuture {
        if self.guard.config().docs {
            return self.inner.call(req);
        }

        let guard = Arc::clone(&self.guard);
        let inner = Arc::clone(&self.inner);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let (mut parts, body, outcome) = tokio::task::spawn_blocking(move || {
                let outcome = guard.authenticate(&parts, &body);
                (parts, body, outcome)
            })
            .await
            .map_err(|e| AuthError::Internal(format!("authentication task failed: {e}")))?;

            match outcome {
                Ok(caller) => {
                    debug!(caller = %caller, path = parts.uri.path(), "request authenticated");
                    parts.extensions.insert(caller);
                    inner.call(http::Request::from_parts(parts, body)).await
                }
                Err(err) => {
                    warn!(path = parts.uri.path(), error = %err, "authentication failed");
                    Err(err)
                }
            }
        })
    }
}

/// Rejects every request with [`AuthError::AdminOnly`] while enforcing.
pub struct AdminOnly<H> {
    inner: H,
    enforce: bool,
}

impl<H> std::fmt::Debug for AdminOnly<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminOnly")
            .field("inner", &"...")
            .field("enforce", &self.enforce)
            .finish()
    }
}

impl<H: Handler> AdminOnly<H> {
    /// Wrap `inner`; when `enforce` is false the wrapper is transparent.
    #[must_use]
    pub fn new(inner: H, enforce: bool) -> Self {
        Self { inner, enforce }
    }
}

impl<H: Handler> Handler for AdminOnly<H> {
    fn call(&self, req: http::Request<Bytes>) -> HandlerFuture {
        if self.enforce {
            warn!(path = req.uri().path(), "admin only endpoint called");
            return reject(AuthError::AdminOnly);
        }
        self.inner.call(req)
    }
}

/// [`Handler`] backed by an async closure. Built by [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Turn an async closure into a [`Handler`].
///
/// ```
/// use oncall_auth_http::{ResponseBody, handler_fn};
///
/// let handler = handler_fn(|_req| async {
///     Ok::<_, oncall_core::AuthError>(http::Response::new(ResponseBody::from_bytes("ok")))
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(http::Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler { f }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(http::Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: http::Request<Bytes>) -> HandlerFuture {
        Box::pin((self.f)(req))
    }
}
