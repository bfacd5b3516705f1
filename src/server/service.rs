use std::io;
use std::sync::Arc;

use arc_swap::ArcSwap;
use may_minihttp::{HttpService, Request, Response};
use tracing::info;

use super::request::IncomingRequest;
use super::response::write_minihttp;
use crate::app::Application;
use crate::context::OutgoingResponse;
use crate::dispatcher::Dispatcher;

/// `may_minihttp` service that feeds every request to the current
/// [`Dispatcher`] snapshot.
///
/// Cloned once per connection. All clones share one snapshot slot, so
/// [`AppService::replace`] takes effect for every connection at once while
/// requests already in flight finish on the snapshot they started with.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<ArcSwap<Dispatcher>>,
}

impl AppService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(ArcSwap::from_pointee(dispatcher)),
        }
    }

    /// Freeze `app` and serve it
    pub fn from_app(app: Application) -> Self {
        Self::new(app.build())
    }

    /// The dispatcher new requests will use
    pub fn snapshot(&self) -> Arc<Dispatcher> {
        self.dispatcher.load_full()
    }

    /// Atomically swap in a rebuilt application
    pub fn replace(&self, app: Application) {
        let next = app.build();
        info!(route_count = next.routes().len(), "Dispatcher snapshot replaced");
        self.dispatcher.store(Arc::new(next));
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let dispatcher = self.dispatcher.load_full();

        let mut incoming = IncomingRequest::new(req.method(), req.path());
        for header in req.headers() {
            incoming = incoming.with_header(header.name, &String::from_utf8_lossy(header.value));
        }
        let mut incoming = incoming.with_body_reader(req.body());

        let result = dispatcher.handle(&mut incoming, &mut |out: OutgoingResponse| {
            write_minihttp(res, out)
        });
        incoming.drain_body();
        result.map(|_| ())
    }
}
