use std::sync::Arc;

use tracing::debug;

use crate::context::{RequestContext, ResponseContext};

/// Result returned by handlers and middleware.
///
/// An `Err` is a handler fault: the dispatcher answers 500 unless a response
/// was already sent.
pub type HandlerResult = anyhow::Result<()>;

/// A route's terminal handler
pub type Handler =
    Arc<dyn Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync>;

/// The terminal stage a chain is composed around.
///
/// Borrowed for one request only, so the dispatcher can wrap the route
/// handler in a local closure.
pub type Terminal<'a> = &'a dyn Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult;

/// A request-processing stage.
///
/// A middleware continues the chain by calling [`Next::run`] once. Not
/// calling it short-circuits: later middleware and the route handler are
/// skipped and whatever was written to `res` (or the default empty response)
/// is sent. `Next` is consumed by `run`, so it cannot be invoked twice or
/// retained past the request.
///
/// Closures of the shape `Fn(&mut RequestContext, &mut ResponseContext, Next<'_>) -> HandlerResult`
/// implement this trait.
pub trait Middleware: Send + Sync {
    fn handle(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
        next: Next<'_>,
    ) -> HandlerResult;

    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut RequestContext, &mut ResponseContext, Next<'_>) -> HandlerResult + Send + Sync,
{
    fn handle(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
        next: Next<'_>,
    ) -> HandlerResult {
        self(req, res, next)
    }

    fn name(&self) -> &'static str {
        "closure"
    }
}

/// Continuation bound to the remaining stages of one request's chain.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    terminal: Terminal<'a>,
}

impl<'a> Next<'a> {
    /// Run the next stage: the following middleware, or the terminal handler
    /// once all middleware have run.
    ///
    /// Does nothing if a response has already been sent.
    pub fn run(self, req: &mut RequestContext, res: &mut ResponseContext) -> HandlerResult {
        if res.is_sent() {
            debug!(
                request_id = %req.request_id(),
                remaining_stages = self.stages.len(),
                "Response already sent - chain not continued"
            );
            return Ok(());
        }
        match self.stages.split_first() {
            Some((mw, rest)) => {
                debug!(
                    request_id = %req.request_id(),
                    middleware_name = mw.name(),
                    "Middleware enter"
                );
                mw.handle(
                    req,
                    res,
                    Next {
                        stages: rest,
                        terminal: self.terminal,
                    },
                )
            }
            None => (self.terminal)(req, res),
        }
    }
}

/// Ordered middleware list. Registration order is execution order.
#[derive(Clone, Default)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. Only valid during setup, before the pipeline is
    /// frozen into a dispatcher.
    pub fn register(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Compose the chain for one request: `middlewares[0]` wraps
    /// `middlewares[1]` wraps ... wraps `terminal`.
    #[must_use]
    pub fn compose<'a>(&'a self, terminal: Terminal<'a>) -> Next<'a> {
        Next {
            stages: &self.middlewares,
            terminal,
        }
    }
}
