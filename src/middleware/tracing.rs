use std::time::Instant;

use tracing::{field, info, info_span};

use super::{HandlerResult, Middleware, Next};
use crate::context::{RequestContext, ResponseContext};

/// Opens a `request` span around the rest of the chain and logs the outcome.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
        next: Next<'_>,
    ) -> HandlerResult {
        let span = info_span!(
            "request",
            request_id = %req.request_id(),
            method = %req.method(),
            path = %req.path(),
            status = field::Empty,
            latency_ms = field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let result = next.run(req, res);

        let latency_ms = start.elapsed().as_millis() as u64;
        let status = res.final_status(result.is_err());
        span.record("status", status);
        span.record("latency_ms", latency_ms);
        info!(
            method = %req.method(),
            path = %req.path(),
            status = status,
            sent = res.is_sent(),
            latency_ms = latency_ms,
            failed = result.is_err(),
            "Request handled"
        );
        result
    }

    fn name(&self) -> &'static str {
        "TracingMiddleware"
    }
}
