//! Setup-time registration API.
//!
//! An [`Application`] collects routes, middleware, body parsing, a static
//! root and a services provider, then freezes into a [`Dispatcher`] with
//! [`Application::build`]. Nothing can be registered after that point.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{
    BodyOptions, BodyParser, RequestContext, ResponseContext, ServiceProvider,
    DEFAULT_MAX_BODY_BYTES,
};
use crate::dispatcher::Dispatcher;
use crate::error::RouteError;
use crate::middleware::{Handler, HandlerResult, Middleware, Next, Pipeline};
use crate::router::RouteTable;
use crate::static_files::StaticFiles;

/// Route, middleware and collaborator registration.
///
/// ```rust
/// use brrtexpress::Application;
///
/// let mut app = Application::new();
/// app.enable_body_parsing();
/// app.use_fn(|req, res, next| {
///     res.set_header("X-Powered-By", "brrtexpress");
///     next.run(req, res)
/// });
/// app.get("/todos/:id", |req, res| {
///     let id = req.param("id").unwrap_or_default().to_string();
///     res.json(&serde_json::json!({ "id": id }))?;
///     Ok(())
/// })?;
///
/// let dispatcher = app.build();
/// assert_eq!(dispatcher.routes().len(), 1);
/// # Ok::<(), brrtexpress::error::RouteError>(())
/// ```
#[derive(Default)]
pub struct Application {
    routes: RouteTable,
    pipeline: Pipeline,
    body_parsing: bool,
    body_parser: Option<Arc<dyn BodyParser>>,
    max_body_bytes: Option<usize>,
    static_files: Option<StaticFiles>,
    services: Option<Arc<dyn ServiceProvider>>,
}

impl Application {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` and `template`.
    ///
    /// Routes are tried in registration order; the first match wins.
    ///
    /// # Errors
    ///
    /// [`RouteError`] if the method is not a valid HTTP token or the
    /// template does not compile.
    pub fn route<F>(&mut self, method: &str, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        self.routes.register(method, template, handler)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`Application::route`].
    pub fn get<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("GET", template, handler)
    }

    /// # Errors
    ///
    /// See [`Application::route`].
    pub fn post<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("POST", template, handler)
    }

    /// # Errors
    ///
    /// See [`Application::route`].
    pub fn put<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("PUT", template, handler)
    }

    /// # Errors
    ///
    /// See [`Application::route`].
    pub fn patch<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("PATCH", template, handler)
    }

    /// # Errors
    ///
    /// See [`Application::route`].
    pub fn delete<F>(&mut self, template: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.route("DELETE", template, handler)
    }

    /// Append a middleware; registration order is execution order
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.add_middleware(Arc::new(middleware))
    }

    /// Append a closure middleware
    pub fn use_fn<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &mut ResponseContext, Next<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_middleware(Arc::new(middleware))
    }

    /// Append an already shared middleware, e.g. one whose counters are
    /// read elsewhere
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        debug!(middleware_name = middleware.name(), position = self.pipeline.len(), "Middleware registered");
        self.pipeline.register(middleware);
        self
    }

    /// Parse request bodies as JSON before the pipeline runs
    pub fn enable_body_parsing(&mut self) -> &mut Self {
        self.body_parsing = true;
        self
    }

    /// Parse request bodies with a custom parser (enables body parsing)
    pub fn with_body_parser(&mut self, parser: Arc<dyn BodyParser>) -> &mut Self {
        self.body_parser = Some(parser);
        self.body_parsing = true;
        self
    }

    /// Largest body that will be buffered; larger bodies are treated as absent
    pub fn max_body_bytes(&mut self, limit: usize) -> &mut Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// Serve files from `dir`, mounted at `/<last component of dir>`
    pub fn serve_static_from<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.serve_static(StaticFiles::new(dir))
    }

    pub fn serve_static(&mut self, files: StaticFiles) -> &mut Self {
        info!(root = %files.root().display(), prefix = files.prefix(), "Static files enabled");
        self.static_files = Some(files);
        self
    }

    /// Provider of per-request service scopes
    pub fn with_services(&mut self, provider: Arc<dyn ServiceProvider>) -> &mut Self {
        self.services = Some(provider);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Freeze into an immutable dispatcher
    #[must_use]
    pub fn build(self) -> Dispatcher {
        let body = self.body_parsing.then(|| {
            let mut opts = BodyOptions::json();
            if let Some(parser) = self.body_parser {
                opts.parser = parser;
            }
            opts.max_bytes = self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
            opts
        });
        self.routes.log_summary();
        info!(
            middleware_count = self.pipeline.len(),
            body_parsing = body.is_some(),
            static_files = self.static_files.is_some(),
            services = self.services.is_some(),
            "Application built"
        );
        Dispatcher::new(
            self.routes,
            self.pipeline,
            self.static_files,
            body,
            self.services,
        )
    }
}
