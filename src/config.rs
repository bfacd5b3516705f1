//! # Server Configuration
//!
//! [`ServerConfig`] is read from an optional TOML file and then overridden
//! by environment variables.
//!
//! | Key | Variable | Default |
//! |---|---|---|
//! | `addr` | `EXPRESS_ADDR` | `127.0.0.1:5000` |
//! | `static_dir` | `EXPRESS_STATIC_DIR` | unset |
//! | `static_prefix` | `EXPRESS_STATIC_PREFIX` | last component of `static_dir` |
//! | `body_parsing` | `EXPRESS_BODY_PARSING` | `false` |
//! | `max_body_bytes` | `EXPRESS_MAX_BODY_BYTES` | 1 MiB |
//! | `stack_size` | `EXPRESS_STACK_SIZE` | `0x8000` |
//!
//! `EXPRESS_STACK_SIZE` accepts decimal (`32768`) or hexadecimal (`0x8000`).
//!
//! ```toml
//! addr = "0.0.0.0:8080"
//! static_dir = "wwwroot"
//! static_prefix = "/"
//! body_parsing = true
//! ```

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::app::Application;
use crate::context::DEFAULT_MAX_BODY_BYTES;
use crate::static_files::StaticFiles;

/// Default coroutine stack size (32 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: String,
    pub static_dir: Option<PathBuf>,
    pub static_prefix: Option<String>,
    pub body_parsing: bool,
    pub max_body_bytes: usize,
    pub stack_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            static_dir: None,
            static_prefix: None,
            body_parsing: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Parse a size given in decimal or `0x` hexadecimal
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Parse `1/true/yes/on` or `0/false/no/off`, ignoring case
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid server configuration")
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// The file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// File (when given) then process environment
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::load`].
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply `EXPRESS_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(addr) = lookup("EXPRESS_ADDR") {
            self.addr = addr;
        }
        if let Some(dir) = lookup("EXPRESS_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(prefix) = lookup("EXPRESS_STATIC_PREFIX") {
            self.static_prefix = Some(prefix);
        }
        if let Some(v) = lookup("EXPRESS_BODY_PARSING") {
            match parse_bool(&v) {
                Some(b) => self.body_parsing = b,
                None => warn!(value = %v, "Ignoring invalid EXPRESS_BODY_PARSING"),
            }
        }
        if let Some(v) = lookup("EXPRESS_MAX_BODY_BYTES") {
            match parse_size(&v) {
                Some(n) => self.max_body_bytes = n,
                None => warn!(value = %v, "Ignoring invalid EXPRESS_MAX_BODY_BYTES"),
            }
        }
        if let Some(v) = lookup("EXPRESS_STACK_SIZE") {
            match parse_size(&v) {
                Some(n) if n > 0 => self.stack_size = n,
                _ => warn!(value = %v, "Ignoring invalid EXPRESS_STACK_SIZE"),
            }
        }
    }

    /// Static root described by this config, if any
    pub fn static_files(&self) -> Option<StaticFiles> {
        let dir = self.static_dir.clone()?;
        Some(match &self.static_prefix {
            Some(prefix) => StaticFiles::mounted(prefix, dir),
            None => StaticFiles::new(dir),
        })
    }

    /// Apply static and body settings to `app`
    pub fn apply<'a>(&self, app: &'a mut Application) -> &'a mut Application {
        if let Some(files) = self.static_files() {
            app.serve_static(files);
        }
        if self.body_parsing {
            app.enable_body_parsing();
        }
        app.max_body_bytes(self.max_body_bytes)
    }
}
