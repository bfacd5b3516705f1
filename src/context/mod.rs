//! Per-request facades handed to middleware and handlers.
//!
//! [`RequestContext`] exposes what arrived (query, params, headers, cookies,
//! the optionally parsed body and the request's service scope).
//! [`ResponseContext`] accumulates the response and enforces that exactly one
//! terminal write (`json`, `send`, `send_status`, `redirect`) succeeds.

mod body;
mod request;
mod response;
mod services;

pub use body::{BodyOptions, BodyParser, JsonBodyParser, DEFAULT_MAX_BODY_BYTES};
pub use request::RequestContext;
pub use response::{reason_phrase, Body, CookieOptions, OutgoingResponse, ResponseContext};
pub use services::{ScopeGuard, ServiceCollection, ServiceProvider, ServiceRef, ServiceScope};
