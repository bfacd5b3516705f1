use std::any::Any;
use std::cell::Cell;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::context::{
    BodyOptions, OutgoingResponse, RequestContext, ResponseContext, ServiceProvider,
};
use crate::error::StaticError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::middleware::{Pipeline, Terminal};
use crate::router::RouteTable;
use crate::server::{IncomingRequest, ResponseSink};
use crate::static_files::StaticFiles;

/// Body of the fixed not-found response
pub const NOT_FOUND_BODY: &str = "404 Not Found";

/// How a request left the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No route matched; fixed 404 written without running middleware
    NotFound,
    /// A route matched and a static file at the request path was served
    StaticServed,
    /// The middleware chain returned normally
    Completed,
    /// The chain returned an error or panicked
    Faulted,
}

/// Frozen request-processing state: routes, middleware, static root, body
/// parsing and services. Built once by
/// [`Application::build`](crate::app::Application::build) and shared
/// read-only by every in-flight request.
pub struct Dispatcher {
    routes: RouteTable,
    pipeline: Pipeline,
    static_files: Option<StaticFiles>,
    body: Option<BodyOptions>,
    services: Option<Arc<dyn ServiceProvider>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Dispatcher {
    pub(crate) fn new(
        routes: RouteTable,
        pipeline: Pipeline,
        static_files: Option<StaticFiles>,
        body: Option<BodyOptions>,
        services: Option<Arc<dyn ServiceProvider>>,
    ) -> Self {
        Self {
            routes,
            pipeline,
            static_files,
            body,
            services,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn static_files(&self) -> Option<&StaticFiles> {
        self.static_files.as_ref()
    }

    pub fn body_parsing_enabled(&self) -> bool {
        self.body.is_some()
    }

    /// Process one request to completion and hand the single response to
    /// `sink`. The sink is written exactly once on every path.
    ///
    /// # Errors
    ///
    /// Only transport errors from `sink` are returned; handler faults are
    /// contained and turned into a response.
    pub fn handle<S: ResponseSink + ?Sized>(
        &self,
        incoming: &mut IncomingRequest<'_>,
        sink: &mut S,
    ) -> io::Result<DispatchOutcome> {
        let (outcome, response) = self.dispatch(incoming);
        sink.write(response)?;
        Ok(outcome)
    }

    /// Process one request and return the response instead of writing it.
    pub fn dispatch(&self, incoming: &mut IncomingRequest<'_>) -> (DispatchOutcome, OutgoingResponse) {
        let start = Instant::now();
        let request_id = RequestId::from_header_or_new(incoming.header(REQUEST_ID_HEADER));

        let Some(route_match) = self.routes.resolve(incoming.method(), incoming.path()) else {
            info!(
                request_id = %request_id,
                method = %incoming.method(),
                path = %incoming.path(),
                status = 404,
                "No route matched - not found"
            );
            return (
                DispatchOutcome::NotFound,
                OutgoingResponse::text(404, NOT_FOUND_BODY),
            );
        };

        let mut req = RequestContext::build(
            incoming,
            &route_match,
            request_id,
            self.body.as_ref(),
            self.services.as_deref(),
        );
        let mut res = ResponseContext::new(request_id);

        if self.try_static(&mut req, &mut res) {
            return (DispatchOutcome::StaticServed, res.into_outgoing());
        }

        debug!(
            request_id = %request_id,
            template = %route_match.route.pattern.template(),
            middleware_count = self.pipeline.len(),
            "Running middleware chain"
        );

        let handler = &route_match.route.handler;
        let reached = Cell::new(false);
        let terminal = |req: &mut RequestContext, res: &mut ResponseContext| {
            reached.set(true);
            handler(req, res)
        };
        let terminal: Terminal<'_> = &terminal;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pipeline.compose(terminal).run(&mut req, &mut res)
        }));

        let fault = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
        };

        let outcome = match fault {
            None => {
                if !reached.get() {
                    debug!(request_id = %request_id, "Middleware short-circuited before handler");
                }
                if !res.is_sent() {
                    debug!(
                        request_id = %request_id,
                        status = res.status_code(),
                        "No terminal write - sending default empty response"
                    );
                }
                DispatchOutcome::Completed
            }
            Some(message) => {
                if res.fault() {
                    error!(
                        request_id = %request_id,
                        method = %req.method(),
                        path = %req.path(),
                        error = %message,
                        "Handler fault - responding 500"
                    );
                } else {
                    error!(
                        request_id = %request_id,
                        status = res.status_code(),
                        error = %message,
                        "Handler fault after response was sent - response stands"
                    );
                }
                DispatchOutcome::Faulted
            }
        };

        if req.release_services() {
            debug!(request_id = %request_id, "Service scope released");
        }

        debug!(
            request_id = %request_id,
            outcome = ?outcome,
            status = res.status_code(),
            latency_us = start.elapsed().as_micros() as u64,
            "Request completed"
        );
        (outcome, res.into_outgoing())
    }

    /// Serve a file at the request path if one exists under the static
    /// root. Middleware and the route handler are skipped on a hit.
    fn try_static(&self, req: &mut RequestContext, res: &mut ResponseContext) -> bool {
        let Some(files) = self.static_files.as_ref() else {
            return false;
        };
        let file = match files.load(req.path()) {
            Ok(file) => file,
            Err(StaticError::Io(e)) => {
                warn!(
                    request_id = %req.request_id(),
                    path = %req.path(),
                    error = %e,
                    "Static file unreadable - falling through to route"
                );
                return false;
            }
            Err(_) => return false,
        };

        if let Err(e) = res.content_type(file.content_type).send(file.bytes) {
            warn!(request_id = %req.request_id(), error = %e, "Static response not written");
        }
        req.release_services();
        info!(
            request_id = %req.request_id(),
            path = %req.path(),
            file = %file.path.display(),
            content_type = file.content_type,
            "Static file served"
        );
        true
    }
}
