//! Per-request service scopes.
//!
//! The core only needs create/dispose semantics: a [`ServiceProvider`] hands
//! out one [`ServiceScope`] per matched request, the scope is owned by that
//! request's [`RequestContext`](super::RequestContext), and it is disposed
//! when the request finishes on every path, including handler panics.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// A type-erased service instance
pub type ServiceRef = Arc<dyn Any + Send + Sync>;

/// Process-wide factory of per-request scopes
pub trait ServiceProvider: Send + Sync {
    fn create_scope(&self) -> Box<dyn ServiceScope>;
}

/// Services visible to one request
pub trait ServiceScope: Send {
    /// Look up a service by key
    fn get(&self, key: &str) -> Option<ServiceRef>;

    /// Release scoped resources. Called exactly once, when the request ends.
    fn dispose(&mut self) {}
}

/// Owns a scope and disposes it exactly once, on drop at the latest.
pub struct ScopeGuard {
    scope: Option<Box<dyn ServiceScope>>,
}

impl ScopeGuard {
    #[must_use]
    pub fn new(scope: Box<dyn ServiceScope>) -> Self {
        Self { scope: Some(scope) }
    }

    #[must_use]
    pub fn scope(&self) -> Option<&dyn ServiceScope> {
        self.scope.as_deref()
    }

    /// Dispose the scope now. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        match self.scope.take() {
            Some(mut scope) => {
                scope.dispose();
                true
            }
            None => false,
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.release() {
            debug!("Service scope released on drop");
        }
    }
}

type Factory = Arc<dyn Fn() -> ServiceRef + Send + Sync>;

/// Minimal keyed service registry.
///
/// Singletons are shared by every request; scoped services are created
/// lazily, at most once per request, and dropped with the scope.
///
/// ```rust
/// use brrtexpress::context::{ServiceCollection, ServiceProvider};
/// use std::sync::atomic::AtomicU64;
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton("greeting", String::from("hello"));
/// services.add_scoped("counter", || AtomicU64::new(0));
///
/// let scope = services.create_scope();
/// let greeting = scope.get("greeting").unwrap().downcast::<String>().unwrap();
/// assert_eq!(greeting.as_str(), "hello");
/// ```
#[derive(Clone, Default)]
pub struct ServiceCollection {
    singletons: Arc<HashMap<String, ServiceRef>>,
    scoped: Arc<HashMap<String, Factory>>,
}

impl ServiceCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value shared by all requests
    pub fn add_singleton<T: Any + Send + Sync>(&mut self, key: &str, value: T) -> &mut Self {
        Arc::make_mut(&mut self.singletons).insert(key.to_string(), Arc::new(value));
        self
    }

    /// Register a factory invoked at most once per request
    pub fn add_scoped<T, F>(&mut self, key: &str, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Arc::new(factory()) as ServiceRef);
        Arc::make_mut(&mut self.scoped).insert(key.to_string(), factory);
        self
    }
}

impl ServiceProvider for ServiceCollection {
    fn create_scope(&self) -> Box<dyn ServiceScope> {
        Box::new(CollectionScope {
            singletons: Arc::clone(&self.singletons),
            factories: Arc::clone(&self.scoped),
            instances: Mutex::new(HashMap::new()),
        })
    }
}

struct CollectionScope {
    singletons: Arc<HashMap<String, ServiceRef>>,
    factories: Arc<HashMap<String, Factory>>,
    instances: Mutex<HashMap<String, ServiceRef>>,
}

impl ServiceScope for CollectionScope {
    fn get(&self, key: &str) -> Option<ServiceRef> {
        if let Some(s) = self.singletons.get(key) {
            return Some(Arc::clone(s));
        }
        let factory = self.factories.get(key)?;
        let mut instances = self.instances.lock().unwrap_or_else(PoisonError::into_inner);
        let instance = instances
            .entry(key.to_string())
            .or_insert_with(|| factory());
        Some(Arc::clone(instance))
    }

    fn dispose(&mut self) {
        self.instances
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_scoped_instance_is_per_scope() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let mut services = ServiceCollection::new();
        services.add_scoped("n", move || counter.fetch_add(1, Ordering::SeqCst));

        let a = services.create_scope();
        let first = a.get("n").unwrap();
        let again = a.get("n").unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let b = services.create_scope();
        let _ = b.get("n").unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_key_is_none() {
        let services = ServiceCollection::new();
        assert!(services.create_scope().get("missing").is_none());
    }

    #[test]
    fn test_guard_releases_once() {
        struct Probe(Arc<AtomicUsize>);
        impl ServiceScope for Probe {
            fn get(&self, _key: &str) -> Option<ServiceRef> {
                None
            }
            fn dispose(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let disposed = Arc::new(AtomicUsize::new(0));
        let mut guard = ScopeGuard::new(Box::new(Probe(Arc::clone(&disposed))));
        assert!(guard.release());
        assert!(!guard.release());
        drop(guard);
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }
}
