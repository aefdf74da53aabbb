//! End-to-end tests for Oncall auth.
//!
//! Every test runs in-process against a seeded [`MemoryDirectory`]; the
//! `test_server` module additionally serves a [`GuardedService`] over a
//! loopback socket.
//!
//! Run them with:
//! ```text
//! cargo test -p oncall-integration
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Once};

use bytes::Bytes;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::warn;

use oncall_auth::digest::{SignedRequest, sign_request};
use oncall_auth_http::{GuardedService, Handler, HandlerFuture, RequestGuard};
use oncall_core::{AuthConfig, Directory, MemoryDirectory, Session};

static INIT: Once = Once::new();

/// Application registered in every fixture.
pub const APP: &str = "svc-a";

/// Shared secret of [`APP`].
pub const APP_KEY: &str = "K";

/// Reference instant; a multiple of the signing window.
pub const T0: i64 = 1_700_000_000;

/// Session cookie name understood by [`SessionLoader`].
pub const SESSION_COOKIE: &str = "oncall-session";

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A seeded directory.
///
/// | who   | what                       |
/// |-------|----------------------------|
/// | alice | member of `sre`            |
/// | bob   | admin of `sre`             |
/// | carol | member of `infra`          |
/// | root  | superuser                  |
///
/// Sessions `sess-<user>` exist for alice, bob and root, each with CSRF token
/// `tok-<user>`.
#[derive(Debug)]
pub struct Fixture {
    /// The backing directory.
    pub directory: Arc<MemoryDirectory>,
    /// Id of the `sre` team.
    pub sre_id: u64,
}

impl Fixture {
    /// Build the seeded directory.
    #[must_use]
    pub fn seeded() -> Self {
        init_tracing();

        let directory = Arc::new(MemoryDirectory::new());
        directory.register_application(APP, APP_KEY);

        let sre_id = directory.add_team("sre");
        directory.add_member("sre", "alice");
        directory.add_admin("sre", "bob");
        directory.add_team("infra");
        directory.add_member("infra", "carol");
        directory.set_superuser("root", true);

        for user in ["alice", "bob", "root"] {
            directory.set_csrf_token(format!("sess-{user}"), format!("tok-{user}"));
        }

        Self { directory, sre_id }
    }

    /// The directory as a trait object.
    #[must_use]
    pub fn store(&self) -> Arc<dyn Directory> {
        Arc::clone(&self.directory) as Arc<dyn Directory>
    }

    /// A guard over this directory whose clock reads `now`.
    #[must_use]
    pub fn guard_at(&self, config: AuthConfig, now: i64) -> Arc<RequestGuard> {
        Arc::new(RequestGuard::new(config, self.store()).with_clock(move || now))
    }
}

/// The session of `user` as established by the login flow.
#[must_use]
pub fn session_of(user: &str) -> Session {
    Session::new(format!("sess-{user}"), user)
}

/// `AUTHORIZATION` value for a request signed by [`APP`] at `unix_seconds`.
#[must_use]
pub fn app_signature(
    method: &str,
    path: &str,
    query: &str,
    body: &[u8],
    unix_seconds: i64,
) -> String {
    let request = SignedRequest::new(method, path, query, body);
    sign_request(APP, APP_KEY.as_bytes(), &request, unix_seconds)
}

/// Resolves the session cookie into a [`Session`] extension.
///
/// Stands in for the session middleware that sits in front of the guard.
#[derive(Debug)]
pub struct SessionLoader<H> {
    sessions: HashMap<String, Session>,
    inner: H,
}

impl<H: Handler> SessionLoader<H> {
    /// Wrap `inner`, knowing the given sessions.
    #[must_use]
    pub fn new(sessions: impl IntoIterator<Item = Session>, inner: H) -> Self {
        Self {
            sessions: sessions.into_iter().map(|s| (s.id.clone(), s)).collect(),
            inner,
        }
    }
}

impl<H: Handler> Handler for SessionLoader<H> {
    fn call(&self, mut req: http::Request<Bytes>) -> HandlerFuture {
        let session = req
            .headers()
            .get(http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| {
                cookies
                    .split(';')
                    .filter_map(|c| c.trim().split_once('='))
                    .find(|(name, _)| *name == SESSION_COOKIE)
                    .map(|(_, id)| id.to_owned())
            })
            .and_then(|id| self.sessions.get(&id).cloned());

        if let Some(session) = session {
            req.extensions_mut().insert(session);
        }
        self.inner.call(req)
    }
}

/// HTTP client for talking to [`spawn_server`]; bypasses any system proxy.
#[must_use]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap_or_else(|e| panic!("failed to build HTTP client: {e}"))
}

/// Serve `service` on an ephemeral loopback port until the runtime stops.
pub async fn spawn_server<H: Handler>(service: GuardedService<H>) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let conn = http
                .serve_connection(TokioIo::new(stream), service.clone())
                .into_owned();
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    warn!(peer_addr = %peer_addr, error = %e, "connection error");
                }
            });
        }
    });

    Ok(addr)
}

mod test_digest;
mod test_session;
