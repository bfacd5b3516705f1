use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{HandlerResult, Middleware, Next};
use crate::context::{RequestContext, ResponseContext};

/// Middleware collecting request counters
///
/// All counters use atomic operations, so one instance can be shared by
/// every in-flight request without locks.
///
/// Metrics collected:
/// - Total request count
/// - Average latency of the downstream chain
/// - Responses per status class (1xx..5xx)
/// - Requests that ended with a handler fault
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    status_classes: [AtomicUsize; 5],
    faults: AtomicUsize,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self {
            request_count: AtomicUsize::new(0),
            total_latency_ns: AtomicU64::new(0),
            status_classes: Default::default(),
            faults: AtomicUsize::new(0),
        }
    }
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests that passed through this middleware
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Calculate the average latency of the downstream chain
    ///
    /// Returns zero duration if no requests have been processed yet.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Responses observed for a status class (`2` for 2xx, `4` for 4xx, ...)
    #[must_use]
    pub fn status_count(&self, class: u16) -> usize {
        match class {
            1..=5 => self.status_classes[usize::from(class - 1)].load(Ordering::Relaxed),
            _ => 0,
        }
    }

    /// Requests whose downstream chain returned an error
    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.faults.load(Ordering::Relaxed)
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
        next: Next<'_>,
    ) -> HandlerResult {
        let start = Instant::now();
        let result = next.run(req, res);
        let latency = start.elapsed();

        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        if result.is_err() {
            self.faults.fetch_add(1, Ordering::Relaxed);
        }
        let class = res.final_status(result.is_err()) / 100;
        if (1..=5).contains(&class) {
            self.status_classes[usize::from(class - 1)].fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn name(&self) -> &'static str {
        "MetricsMiddleware"
    }
}
