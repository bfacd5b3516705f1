use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::app::Application;
use crate::config::ServerConfig;
use crate::logging::{init_logging, LogConfig, LogFormat};
use crate::server::{AppService, HttpServer, ServerHandle};

/// Command-line interface for a brrtexpress application
#[derive(Parser, Debug)]
#[command(name = "brrtexpress")]
#[command(about = "Express-style HTTP server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server until SIGINT or SIGTERM
    Serve(ServeArgs),
    /// Print the registered routes and exit
    Routes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub addr: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "EXPRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serve static files from this directory
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// URL prefix for --static-dir (defaults to the directory name)
    #[arg(long, requires = "static_dir")]
    pub static_prefix: Option<String>,

    /// Parse JSON request bodies before handlers run
    #[arg(long, default_value_t = false)]
    pub body_parsing: bool,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,
}

impl ServeArgs {
    /// Layer the command line flags over `config`
    pub fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(addr) = &self.addr {
            config.addr.clone_from(addr);
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = Some(dir.clone());
            config.static_prefix.clone_from(&self.static_prefix);
        }
        if self.body_parsing {
            config.body_parsing = true;
        }
    }

    /// Defaults, config file, environment, then flags
    ///
    /// # Errors
    ///
    /// The config file cannot be read or parsed.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::resolve(self.config.as_deref())?;
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn log_config(&self) -> LogConfig {
        let mut log = LogConfig::from_env();
        if let Some(format) = self.log_format {
            log.format = format.into();
        }
        log
    }
}

/// Execute a parsed command. `build_app` registers the application's
/// routes and middleware; config-driven settings are layered on after it.
///
/// # Errors
///
/// Logging, configuration, application setup or server startup failures.
pub fn run_cli<F>(cli: Cli, build_app: F) -> Result<()>
where
    F: FnOnce() -> Result<Application>,
{
    match cli.command {
        Commands::Serve(args) => {
            let _log_guard = init_logging(&args.log_config())?;
            let config = args.server_config()?;
            let mut app = build_app()?;
            config.apply(&mut app);
            run_server(&config, app)
        }
        Commands::Routes => {
            let app = build_app()?;
            for route in app.routes().routes() {
                println!("{:<7} {}", route.method.as_str(), route.pattern.template());
            }
            Ok(())
        }
    }
}

/// Start serving `app` and block until a shutdown signal arrives.
///
/// # Errors
///
/// The address cannot be bound or the listener never becomes ready.
pub fn run_server(config: &ServerConfig, app: Application) -> Result<()> {
    may::config().set_stack_size(config.stack_size);
    info!(stack_size = config.stack_size, "Coroutine stack size configured");

    let service = AppService::from_app(app);
    let handle = HttpServer(service)
        .start(config.addr.as_str())
        .with_context(|| format!("Failed to start server on {}", config.addr))?;
    handle.wait_ready().context("Server did not become ready")?;
    info!(addr = %handle.addr(), "Server ready");

    serve_until_signal(handle)
}

#[cfg(unix)]
fn serve_until_signal(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal = signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn serve_until_signal(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("Server coroutine panicked: {e:?}"))
}
