//! HTTP integration for Oncall auth.
//!
//! [`RequestGuard`] authenticates hyper requests, either by HMAC digest or by
//! session plus CSRF token. Endpoints are written as [`Handler`]s and wrapped
//! with [`LoginRequired`] and [`AdminOnly`]; [`GuardedService`] serves the
//! result through hyper and renders failures as JSON:
//!
//! ```json
//! { "title": "Authentication failure", "description": "Wrong digest" }
//! ```
//!
//! # Modules
//!
//! - [`body`] - Response body type
//! - [`guard`] - Request authentication
//! - [`handler`] - Handler trait and authentication wrappers
//! - [`response`] - Error response formatting
//! - [`service`] - Hyper service

pub mod body;
pub mod guard;
pub mod handler;
pub mod response;
pub mod service;

pub use body::ResponseBody;
pub use guard::{Clock, RequestGuard};
pub use handler::{
    AdminOnly, FnHandler, Handler, HandlerFuture, HandlerResult, LoginRequired, caller,
    handler_fn,
};
pub use response::{error_to_json, error_to_response};
pub use service::{DEFAULT_BODY_LIMIT, GuardedService};
