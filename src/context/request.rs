use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::body::BodyOptions;
use super::services::{ScopeGuard, ServiceProvider, ServiceScope};
use crate::ids::RequestId;
use crate::router::RouteMatch;
use crate::server::IncomingRequest;

/// Read-only view of one matched request.
///
/// Built by the dispatcher after routing and before any middleware runs.
/// The parsed body, when enabled, is populated here once and never again.
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    query: HashMap<String, String>,
    params: HashMap<String, String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    body: Option<Value>,
    services: Option<ScopeGuard>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("has_body", &self.body.is_some())
            .field("has_services", &self.services.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    pub(crate) fn build(
        incoming: &mut IncomingRequest<'_>,
        route_match: &RouteMatch,
        request_id: RequestId,
        body_options: Option<&BodyOptions>,
        provider: Option<&dyn ServiceProvider>,
    ) -> Self {
        let body = match body_options {
            Some(opts) if incoming.declares_body() => incoming
                .body_mut()
                .and_then(|reader| opts.read_and_parse(reader)),
            _ => None,
        };

        let services = provider.map(|p| {
            debug!(request_id = %request_id, "Service scope created");
            ScopeGuard::new(p.create_scope())
        });

        Self {
            request_id,
            method: route_match.route.method.clone(),
            path: incoming.path().to_string(),
            query: incoming.query_map(),
            params: route_match.path_params_map(),
            headers: incoming.header_map(),
            cookies: incoming.cookie_map(),
            body,
            services,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query-string value (last occurrence wins)
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Path parameter captured by the route pattern
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Header value, case-insensitive
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Parsed body. `None` when parsing is disabled, no body was sent, or
    /// the body failed to parse.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Deserialize the parsed body into `T`; `None` if absent or mismatched.
    #[must_use]
    pub fn body_as<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.body.as_ref()?;
        T::deserialize(value).ok()
    }

    /// This request's service scope, if a provider was configured
    #[must_use]
    pub fn services(&self) -> Option<&dyn ServiceScope> {
        self.services.as_ref().and_then(ScopeGuard::scope)
    }

    /// Typed service lookup
    #[must_use]
    pub fn service<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.services()?.get(key)?.downcast::<T>().ok()
    }

    #[must_use]
    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.query
    }

    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// Dispose the service scope now. Returns whether one was held.
    pub(crate) fn release_services(&mut self) -> bool {
        self.services
            .as_mut()
            .is_some_and(ScopeGuard::release)
    }
}
