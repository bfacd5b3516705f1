//! # Router Module
//!
//! Path-template compilation and route resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling Express-style templates (`/todos/:id`) into anchored matchers
//! - Keeping routes in registration order
//! - Resolving a method + path to the first matching route and its parameters
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: at registration, each template becomes a
//!    [`CompiledPattern`] (plain string comparison when the template has no
//!    parameters, an anchored regex with one `([^/]+)` group per `:name`
//!    otherwise).
//!
//! 2. **Matching**: for each request, [`RouteTable::resolve`] scans routes in
//!    registration order and returns the first whose method and pattern match.
//!
//! ## Example
//!
//! ```rust
//! use brrtexpress::router::RouteTable;
//! use std::sync::Arc;
//!
//! let mut table = RouteTable::new();
//! table
//!     .register("get", "/todos/:id", Arc::new(|_req, res| {
//!         res.send("ok")?;
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let m = table.resolve("GET", "/todos/42").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! assert!(table.resolve("GET", "/todos/42/extra").is_none());
//! ```
//!
//! ## Performance
//!
//! Resolution is O(n) in the number of routes. The contract (registration
//! order, first match wins) is independent of the matching strategy, so a
//! prefix tree can replace the scan without changing behaviour.

mod core;
mod pattern;
#[cfg(test)]
mod tests;

pub use core::{normalize_method, ParamVec, Route, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
pub use pattern::CompiledPattern;
