//! Hyper `Service` wrapping a guarded [`Handler`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{debug, warn};

use crate::body::ResponseBody;
use crate::handler::Handler;
use crate::response::{CONTENT_TYPE, REQUEST_ID_HEADER, error_to_response};

/// Largest request body buffered by default (10 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Hyper `Service` implementation for guarded handlers.
///
/// Buffers the request body (up to a limit), runs the handler chain, and
/// converts any [`oncall_core::AuthError`] into a JSON error response. Every
/// response carries an `x-request-id` header.
#[derive(Debug)]
pub struct GuardedService<H: Handler> {
    handler: Arc<H>,
    body_limit: usize,
}

impl<H: Handler> GuardedService<H> {
    /// Create a new `GuardedService` with [`DEFAULT_BODY_LIMIT`].
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Reject request bodies larger than `limit` bytes with 413.
    #[must_use]
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<H: Handler> Clone for GuardedService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            body_limit: self.body_limit,
        }
    }
}

impl<H, B> hyper::service::Service<http::Request<B>> for GuardedService<H>
where
    H: Handler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let body_limit = self.body_limit;
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), body_limit, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    body_limit: usize,
    request_id: &str,
) -> http::Response<ResponseBody>
where
    H: Handler,
    B: http_body::Body,
    B::Error: Into<BoxError>,
{
    let (parts, incoming) = req.into_parts();

    let body = match collect_body(incoming, body_limit).await {
        Ok(body) => body,
        Err((status, message)) => {
            warn!(request_id, %status, error = %message, "failed to read request body");
            return body_error(status, &message);
        }
    };

    debug!(
        request_id,
        method = %parts.method,
        path = parts.uri.path(),
        "dispatching guarded request"
    );

    match handler.call(http::Request::from_parts(parts, body)).await {
        Ok(response) => response,
        Err(err) => error_to_response(&err, request_id),
    }
}

/// Collect the incoming body into a single `Bytes` buffer of at most
/// `limit` bytes.
async fn collect_body<B>(incoming: B, limit: usize) -> Result<Bytes, (http::StatusCode, String)>
where
    B: http_body::Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(incoming, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err((
            http::StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body exceeds {limit} bytes"),
        )),
        Err(e) => Err((
            http::StatusCode::BAD_REQUEST,
            format!("Failed to read request body: {e}"),
        )),
    }
}

fn body_error(status: http::StatusCode, message: &str) -> http::Response<ResponseBody> {
    let body = serde_json::json!({
        "title": status.canonical_reason().unwrap_or("Bad Request"),
        "description": message,
    });
    let mut response = http::Response::new(ResponseBody::from_bytes(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(CONTENT_TYPE),
    );
    response
}

/// Add the request id unless the handler already set one.
fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().entry(REQUEST_ID_HEADER).or_insert(hv);
    }
    response
}
