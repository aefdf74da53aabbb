//! Error response formatting.

use oncall_core::{AuthError, ErrorKind};
use tracing::warn;

use crate::body::ResponseBody;

/// Content type of error responses.
pub const CONTENT_TYPE: &str = "application/json";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Serialize an [`AuthError`] into a JSON body.
///
/// ```json
/// {
///   "title": "Authentication failure",
///   "description": "Wrong digest"
/// }
/// ```
///
/// Store and internal failures are described by their title only; the
/// underlying detail is logged, never sent to the client.
#[must_use]
pub fn error_to_json(error: &AuthError) -> Vec<u8> {
    let description = match error.kind() {
        ErrorKind::Unauthenticated | ErrorKind::Forbidden => error.to_string(),
        ErrorKind::Unavailable | ErrorKind::Internal => {
            warn!(error = %error, "auth layer failure");
            error.title().to_owned()
        }
    };

    serde_json::to_vec(&serde_json::json!({
        "title": error.title(),
        "description": description,
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Convert an [`AuthError`] into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &AuthError, request_id: &str) -> http::Response<ResponseBody> {
    let mut response = http::Response::builder()
        .status(error.status_code())
        .header("content-type", CONTENT_TYPE)
        .body(ResponseBody::from_bytes(error_to_json(error)))
        .expect("valid error response");

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }

    response
}
