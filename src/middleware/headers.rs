use super::{HandlerResult, Middleware, Next};
use crate::context::{RequestContext, ResponseContext};

/// Adds a fixed header to every response, then continues the chain.
///
/// ```rust
/// use brrtexpress::middleware::SetHeaderMiddleware;
///
/// let powered_by = SetHeaderMiddleware::new("X-Powered-By", "brrtexpress");
/// assert_eq!(powered_by.header_name(), "X-Powered-By");
/// ```
pub struct SetHeaderMiddleware {
    name: String,
    value: String,
}

impl SetHeaderMiddleware {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.name
    }
}

impl Middleware for SetHeaderMiddleware {
    fn handle(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
        next: Next<'_>,
    ) -> HandlerResult {
        res.set_header(&self.name, &self.value);
        next.run(req, res)
    }

    fn name(&self) -> &'static str {
        "SetHeaderMiddleware"
    }
}
