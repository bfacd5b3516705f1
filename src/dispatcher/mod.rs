//! # Dispatcher Module
//!
//! Drives one request from route resolution to its single response.
//!
//! ## Request Flow
//!
//! ```text
//! Received → Resolving ─┬─ no route ──────────────────→ NotFound (fixed 404)
//!                        └─ match → build contexts ─┬─ static file ─→ StaticServed
//!                                                   └─ middleware chain → handler → Completed
//! ```
//!
//! 1. The route table is consulted with the request method and path
//! 2. On a miss the fixed `404 Not Found` response is written; middleware never runs
//! 3. On a match the request and response contexts are built (query, params,
//!    headers, cookies, optional parsed body, optional service scope)
//! 4. If a static root is configured and a file exists at the request path it
//!    is served, even though a route matched
//! 5. Otherwise the middleware chain runs around the route handler
//!
//! ## Error Handling
//!
//! A handler or middleware that returns `Err` or panics is contained here.
//! If nothing was sent yet the client gets a 500 JSON error; otherwise the
//! response already sent stands. The per-request service scope is released
//! on every path, including faults.

mod core;

pub use core::{DispatchOutcome, Dispatcher, NOT_FOUND_BODY};
