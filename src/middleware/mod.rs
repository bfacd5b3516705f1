//! # Middleware Module
//!
//! Ordered, continuation-passing middleware around a route's terminal handler.
//!
//! ```text
//! Request → MW1 ─next→ MW2 ─next→ MW3 ─next→ Handler
//!            ↑ returns ←─ ↑ returns ←─ ↑ returns ←┘
//! ```
//!
//! The first registered middleware runs first and wraps all later ones.
//! A middleware that returns without calling `next` short-circuits the rest
//! of the chain, which is how authentication or rate-limit stages refuse a
//! request.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brrtexpress::Application;
//!
//! let mut app = Application::new();
//! app.use_fn(|req, res, next| {
//!     if req.header("authorization").is_none() {
//!         res.send_status(401)?;
//!         return Ok(());
//!     }
//!     next.run(req, res)
//! });
//! ```

mod core;
mod headers;
mod metrics;
mod tracing;

pub use core::{Handler, HandlerResult, Middleware, Next, Pipeline, Terminal};
pub use headers::SetHeaderMiddleware;
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
