use std::io::Read;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BodyParseError;

/// Default upper bound on a buffered request body (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Turns raw body bytes into a structured value.
pub trait BodyParser: Send + Sync {
    /// # Errors
    ///
    /// Returns [`BodyParseError`] when the bytes are not valid for this format.
    fn parse(&self, bytes: &[u8]) -> Result<Value, BodyParseError>;
}

/// JSON body parser backed by `serde_json`
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBodyParser;

impl BodyParser for JsonBodyParser {
    fn parse(&self, bytes: &[u8]) -> Result<Value, BodyParseError> {
        serde_json::from_slice(bytes).map_err(|e| BodyParseError::new(e.to_string()))
    }
}

/// Body parsing settings frozen into a dispatcher
#[derive(Clone)]
pub struct BodyOptions {
    pub parser: Arc<dyn BodyParser>,
    pub max_bytes: usize,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self::json()
    }
}

impl BodyOptions {
    /// JSON parsing with the default size limit
    #[must_use]
    pub fn json() -> Self {
        Self {
            parser: Arc::new(JsonBodyParser),
            max_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Read the whole body into memory and parse it.
    ///
    /// Every failure (read error, empty body, over-limit body, parse error)
    /// yields `None`, exactly as if no body had been sent.
    pub fn read_and_parse(&self, reader: &mut dyn Read) -> Option<Value> {
        let limit = self.max_bytes as u64 + 1;
        let mut buf = Vec::new();
        if let Err(e) = reader.take(limit).read_to_end(&mut buf) {
            debug!(error = %e, "Request body read failed");
            return None;
        }
        if buf.is_empty() {
            return None;
        }
        if buf.len() > self.max_bytes {
            warn!(
                max_body_bytes = self.max_bytes,
                "Request body exceeds limit - treated as absent"
            );
            return None;
        }

        let parse_start = std::time::Instant::now();
        match self.parser.parse(&buf) {
            Ok(value) => {
                debug!(
                    body_size_bytes = buf.len(),
                    parse_duration_us = parse_start.elapsed().as_micros(),
                    body_fields = value.as_object().map(|o| o.len()),
                    "Request body parsed"
                );
                Some(value)
            }
            Err(e) => {
                debug!(body_size_bytes = buf.len(), error = %e, "Request body parse failed");
                None
            }
        }
    }
}
