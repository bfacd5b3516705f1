//! Router core module - hot path for request routing.
//!
//! Routes are kept in registration order and resolved by linear scan;
//! the first structural match wins. No specificity ranking is applied.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::pattern::CompiledPattern;
use crate::error::RouteError;
use crate::middleware::Handler;

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 params (e.g. `/users/:id/posts/:post_id`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>` shared with the compiled pattern, so a match
/// only allocates the captured values.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Normalize a method name to its canonical upper-case `http::Method`.
///
/// # Errors
///
/// Returns [`RouteError::InvalidMethod`] if the name is not a valid HTTP token.
pub fn normalize_method(method: &str) -> Result<Method, RouteError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| RouteError::InvalidMethod(method.to_string()))
}

/// One registered route. Immutable once registered.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: CompiledPattern,
    pub handler: Handler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.pattern.template())
            .finish_non_exhaustive()
    }
}

/// Result of successfully resolving a request to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (shared with the route table)
    pub route: Arc<Route>,
    /// Path parameters in template declaration order
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if a template repeats a name
    /// (e.g. `/org/:id/user/:id`), the later capture is returned.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap (last write wins)
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Ordered route table with first-match-wins resolution.
///
/// Identical `(method, template)` pairs are not deduplicated; the first one
/// registered always wins. The table is populated during setup and then
/// frozen inside a [`Dispatcher`](crate::dispatcher::Dispatcher) snapshot.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route.
    ///
    /// # Errors
    ///
    /// Fails if the method is not a valid token or the template does not compile.
    pub fn register(
        &mut self,
        method: &str,
        template: &str,
        handler: Handler,
    ) -> Result<(), RouteError> {
        let method = normalize_method(method)?;
        let pattern = CompiledPattern::compile(template)?;
        debug!(
            method = %method,
            template = %pattern.template(),
            params = ?pattern.param_names(),
            position = self.routes.len(),
            "Route registered"
        );
        self.routes.push(Arc::new(Route {
            method,
            pattern,
            handler,
        }));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes in registration order
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    /// Log a summary of the table, as done once when a dispatcher is built.
    pub fn log_summary(&self) {
        let routes_summary: Vec<String> = self
            .routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.pattern.template()))
            .collect();
        info!(
            routes_count = self.routes.len(),
            routes_summary = ?routes_summary,
            routing_algorithm = "linear_first_match",
            "Routing table loaded"
        );
    }

    /// Resolve a request to the first route whose method and pattern match.
    ///
    /// The method is compared case-insensitively.
    #[must_use]
    pub fn resolve(&self, method: &str, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let method = match normalize_method(method) {
            Ok(m) => m,
            Err(_) => {
                warn!(method = %method, path = %path, "Unroutable request method");
                return None;
            }
        };

        let found = self.routes.iter().find_map(|route| {
            if route.method != method {
                return None;
            }
            route
                .pattern
                .matches(path)
                .map(|params| (Arc::clone(route), params))
        });
        let match_duration = match_start.elapsed();

        match found {
            Some((route, path_params)) => {
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.pattern.template(),
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.pattern.template(),
                        path_params = ?path_params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                Some(RouteMatch { route, path_params })
            }
            None => {
                debug!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
                None
            }
        }
    }
}
