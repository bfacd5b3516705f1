//! # brrtexpress
//!
//! **brrtexpress** is a small Express-style HTTP router and middleware engine
//! running on the `may` coroutine runtime and `may_minihttp`.
//!
//! ## Overview
//!
//! Applications register handlers against path templates such as
//! `/todos/:id`, wrap them in an ordered middleware chain, and optionally
//! serve static files and parse JSON bodies. Every request receives exactly
//! one response: handler faults and panics are contained at the dispatcher
//! and turned into a 500, and unmatched requests get a fixed 404.
//!
//! ## Architecture
//!
//! - **[`router`]** - Path template compilation and first-match route resolution
//! - **[`middleware`]** - Continuation-passing middleware chain and built-in middleware
//! - **[`context`]** - Per-request `RequestContext` / `ResponseContext` facades,
//!   body parsing and per-request service scopes
//! - **[`dispatcher`]** - Request state machine: resolve, static, pipeline, not found
//! - **[`static_files`]** - Sanitized static file lookup
//! - **[`app`]** - Setup-time registration API that freezes into a dispatcher
//! - **[`server`]** - `may_minihttp` binding: `AppService`, `HttpServer`
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - Ambient server plumbing
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as may_minihttp
//!     participant Service as AppService
//!     participant Dispatcher
//!     participant Router as RouteTable
//!     participant Static as StaticFiles
//!     participant Chain as Middleware chain
//!     participant Handler
//!
//!     Client->>Server: HTTP request
//!     Server->>Service: call(req, res)
//!     Service->>Dispatcher: handle(IncomingRequest, sink)
//!     Dispatcher->>Router: resolve(method, path)
//!     alt no match
//!         Dispatcher-->>Service: 404 Not Found
//!     else match
//!         Dispatcher->>Dispatcher: build RequestContext / ResponseContext
//!         Dispatcher->>Static: load(path)
//!         alt file exists
//!             Dispatcher-->>Service: file bytes
//!         else
//!             Dispatcher->>Chain: run(req, res)
//!             Chain->>Handler: next.run(req, res)
//!             Handler-->>Chain: Ok / Err / panic
//!             Chain-->>Dispatcher: result
//!             Dispatcher-->>Service: response (500 on fault if unsent)
//!         end
//!     end
//!     Service->>Server: write once
//!     Server-->>Client: HTTP response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtexpress::Application;
//! use brrtexpress::server::IncomingRequest;
//!
//! let mut app = Application::new();
//! app.get("/hello/:name", |req, res| {
//!     let name = req.param("name").unwrap_or("world").to_string();
//!     res.send(format!("Hello, {name}!"))?;
//!     Ok(())
//! })?;
//!
//! let dispatcher = app.build();
//! let (_, response) = dispatcher.dispatch(&mut IncomingRequest::new("GET", "/hello/may"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, b"Hello, may!");
//! # Ok::<(), brrtexpress::error::RouteError>(())
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod server;
pub mod static_files;

pub use app::Application;
pub use context::{Body, CookieOptions, OutgoingResponse, RequestContext, ResponseContext};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{PatternError, ResponseError, RouteError, StaticError};
pub use ids::RequestId;
pub use middleware::{Handler, HandlerResult, Middleware, Next, Pipeline};
pub use router::{RouteMatch, RouteTable};
pub use server::{AppService, HttpServer, IncomingRequest, ResponseSink, ServerHandle};
pub use static_files::StaticFiles;
