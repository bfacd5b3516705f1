//! # CLI Module
//!
//! Command line front end shared by applications built on the crate.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the HTTP server:
//!
//! ```bash
//! todo-api serve --addr 0.0.0.0:8080 --static-dir wwwroot --body-parsing
//! ```
//!
//! Options:
//! - `--addr <ADDR>` - Listen address (overrides config and `EXPRESS_ADDR`)
//! - `--config <FILE>` - TOML configuration file
//! - `--static-dir <DIR>` - Serve static files from this directory
//! - `--static-prefix <PREFIX>` - URL prefix for the static directory
//! - `--body-parsing` - Parse JSON request bodies
//! - `--log-format <json|pretty>` - Log output format
//!
//! ### `routes`
//!
//! Print the route table in resolution order and exit.
//!
//! Settings are layered: built-in defaults, then the config file, then
//! `EXPRESS_*` environment variables, then command line flags.

mod commands;

pub use commands::{run_cli, run_server, Cli, Commands, LogFormatArg, ServeArgs};
