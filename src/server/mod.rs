//! # Server Module
//!
//! Binds the dispatcher to the `may_minihttp` transport.
//!
//! - [`IncomingRequest`] is the transport-neutral request the dispatcher
//!   consumes: method, path, query string, headers and a body stream
//! - [`ResponseSink`] receives the single finished response
//! - [`AppService`] implements `may_minihttp::HttpService`; one coroutine
//!   per connection calls it once per request
//! - [`HttpServer`] starts the accept loop and returns a [`ServerHandle`]
//!
//! ```rust,no_run
//! use brrtexpress::server::{AppService, HttpServer};
//! use brrtexpress::Application;
//!
//! let mut app = Application::new();
//! app.get("/hello", |_req, res| {
//!     res.send("Hello")?;
//!     Ok(())
//! })?;
//!
//! let handle = HttpServer(AppService::from_app(app)).start("127.0.0.1:5000")?;
//! handle.wait_ready()?;
//! handle.join().ok();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_cookies, parse_query, IncomingRequest};
pub use response::{
    write_minihttp, HeaderLines, ResponseSink, MAX_INTERNED_HEADER_LINES, MAX_RESPONSE_HEADERS,
};
pub use service::AppService;
