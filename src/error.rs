//! Error types shared across the router, response facade and static file layer.
//!
//! Faults raised by application handlers and middleware travel as
//! [`anyhow::Error`]; the enums here cover the failures the core itself can
//! detect. None of them ever escapes a single request: the dispatcher turns
//! each one into a well-defined HTTP response.

use std::fmt;
use std::io;

/// Route template compilation error
///
/// Returned by [`CompiledPattern::compile`](crate::router::CompiledPattern::compile)
/// when a template cannot be turned into a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The template was the empty string
    ///
    /// Use `"/"` to register a handler for the root path.
    Empty,
    /// A `:` is not followed by an identifier character (e.g. `/users/:` or
    /// `/users/:-id`). In `/users/:a-b` the name ends at `-`, which stays literal.
    InvalidParameter {
        /// The template being compiled
        template: String,
        /// The offending segment
        segment: String,
    },
    /// The generated matcher was rejected by the regex engine
    Compile(String),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Empty => write!(
                f,
                "route template is empty; register \"/\" to match the root path"
            ),
            PatternError::InvalidParameter { template, segment } => write!(
                f,
                "route template '{template}' has an invalid parameter segment '{segment}'. \
                Expected ':' followed by letters, digits or '_'"
            ),
            PatternError::Compile(msg) => write!(f, "route matcher failed to compile: {msg}"),
        }
    }
}

impl std::error::Error for PatternError {}

/// Route registration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The method is not a valid HTTP token
    InvalidMethod(String),
    /// The path template did not compile
    Pattern(PatternError),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidMethod(m) => write!(f, "invalid HTTP method '{m}'"),
            RouteError::Pattern(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Pattern(e) => Some(e),
            RouteError::InvalidMethod(_) => None,
        }
    }
}

impl From<PatternError> for RouteError {
    fn from(e: PatternError) -> Self {
        RouteError::Pattern(e)
    }
}

/// Error returned when a terminal write is attempted on a response that
/// has already been sent.
///
/// The first response always stands; the rejected write is never put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// A second terminal operation (`json`, `send`, `send_status`, `redirect`)
    AlreadySent {
        /// Name of the rejected operation
        attempted: &'static str,
    },
    /// The value passed to `json` could not be serialized
    Serialize(String),
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseError::AlreadySent { attempted } => write!(
                f,
                "response already sent; '{attempted}' was rejected and the first response stands"
            ),
            ResponseError::Serialize(msg) => write!(f, "failed to serialize JSON body: {msg}"),
        }
    }
}

impl std::error::Error for ResponseError {}

/// Error returned by a [`BodyParser`](crate::context::BodyParser).
///
/// The dispatcher never propagates it: a body that fails to parse is
/// presented to handlers as an absent body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyParseError {
    /// Human readable reason
    pub reason: String,
}

impl BodyParseError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BodyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request body could not be parsed: {}", self.reason)
    }
}

impl std::error::Error for BodyParseError {}

/// Static file lookup failure
#[derive(Debug)]
pub enum StaticError {
    /// No regular file exists at the mapped path, or the path is outside the mount prefix
    NotFound,
    /// The request path tried to leave the static root (`..`, absolute or drive components)
    PathEscape {
        /// The rejected request path
        path: String,
    },
    /// The file exists but could not be read
    Io(io::Error),
}

impl StaticError {
    /// Whether the request should simply fall through to the dynamic route.
    ///
    /// Both a missing file and an escape attempt are treated as "no file here".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StaticError::NotFound | StaticError::PathEscape { .. })
    }
}

impl fmt::Display for StaticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticError::NotFound => write!(f, "static file not found"),
            StaticError::PathEscape { path } => {
                write!(f, "static path '{path}' escapes the configured root")
            }
            StaticError::Io(e) => write!(f, "static file read failed: {e}"),
        }
    }
}

impl std::error::Error for StaticError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StaticError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StaticError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StaticError::NotFound
        } else {
            StaticError::Io(e)
        }
    }
}
