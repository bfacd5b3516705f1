use std::io;
use std::sync::LazyLock;

use dashmap::DashMap;
use may_minihttp::Response;
use tracing::{debug, warn};

use crate::context::{reason_phrase, OutgoingResponse};

/// Header slots available in a `may_minihttp` response
pub const MAX_RESPONSE_HEADERS: usize = 16;

/// Upper bound on distinct header lines cached for the process lifetime
pub const MAX_INTERNED_HEADER_LINES: usize = 65_536;

/// Destination of a finished response.
///
/// The dispatcher calls `write` exactly once per request. Any
/// `FnMut(OutgoingResponse) -> io::Result<()>` closure is a sink.
pub trait ResponseSink {
    /// # Errors
    ///
    /// Transport failures while writing the response.
    fn write(&mut self, response: OutgoingResponse) -> io::Result<()>;
}

impl<F> ResponseSink for F
where
    F: FnMut(OutgoingResponse) -> io::Result<()>,
{
    fn write(&mut self, response: OutgoingResponse) -> io::Result<()> {
        self(response)
    }
}

/// Header lines that differ between requests. They are never cached.
const PER_REQUEST_HEADERS: [&str; 2] = ["set-cookie", "location"];

/// `&'static str` header lines for `may_minihttp`.
///
/// Repeated lines such as `Content-Type: application/json` are leaked once
/// and reused. Per-request lines, and every line once the cache holds
/// `capacity` entries, are leaked on each use so a header is never dropped.
pub struct HeaderLines {
    cache: DashMap<String, &'static str>,
    capacity: usize,
}

impl HeaderLines {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: DashMap::new(),
            capacity,
        }
    }

    /// Static `name: value` line, or `None` if either part contains a line
    /// break.
    pub fn line(&self, name: &str, value: &str) -> Option<&'static str> {
        let line = header_line(name, value)?;
        if PER_REQUEST_HEADERS
            .iter()
            .any(|h| name.eq_ignore_ascii_case(h))
        {
            return Some(leak(line));
        }
        if let Some(existing) = self.cache.get(&line) {
            return Some(*existing);
        }
        if self.cache.len() >= self.capacity {
            debug!(header = %name, capacity = self.capacity, "Header line cache full - leaking uncached line");
            return Some(leak(line));
        }
        let leaked = leak(line.clone());
        Some(*self.cache.entry(line).or_insert(leaked))
    }

    /// Number of cached lines
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn leak(line: String) -> &'static str {
    Box::leak(line.into_boxed_str())
}

static HEADER_LINES: LazyLock<HeaderLines> =
    LazyLock::new(|| HeaderLines::with_capacity(MAX_INTERNED_HEADER_LINES));

fn header_line(name: &str, value: &str) -> Option<String> {
    if [name, value].iter().any(|s| s.contains(['\r', '\n'])) {
        return None;
    }
    Some(format!("{name}: {value}"))
}

/// Write `out` onto a `may_minihttp` response.
///
/// Headers containing line breaks and headers beyond
/// [`MAX_RESPONSE_HEADERS`] are dropped with a warning.
/// `Content-Length` is computed by the transport.
pub fn write_minihttp(res: &mut Response, out: OutgoingResponse) -> io::Result<()> {
    res.status_code(usize::from(out.status), reason_phrase(out.status));

    let mut written = 0usize;
    for (name, value) in &out.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if written == MAX_RESPONSE_HEADERS {
            warn!(header = %name, limit = MAX_RESPONSE_HEADERS, "Response header limit reached - header dropped");
            continue;
        }
        match HEADER_LINES.line(name, value) {
            Some(line) => {
                res.header(line);
                written += 1;
            }
            None => warn!(header = %name, "Response header contains a line break - dropped"),
        }
    }

    res.body_vec(out.body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResponseContext;
    use crate::ids::RequestId;

    #[test]
    fn test_repeated_lines_are_cached() {
        let lines = HeaderLines::with_capacity(8);
        let a = lines.line("X-Test", "cached").unwrap();
        let b = lines.line("X-Test", "cached").unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(lines.cached(), 1);
    }

    #[test]
    fn test_per_request_headers_bypass_cache() {
        let lines = HeaderLines::with_capacity(8);
        assert_eq!(lines.line("Set-Cookie", "session=1"), Some("Set-Cookie: session=1"));
        assert_eq!(lines.line("Location", "/todos/1"), Some("Location: /todos/1"));
        assert_eq!(lines.cached(), 0);
    }

    #[test]
    fn test_full_cache_still_yields_lines() {
        let lines = HeaderLines::with_capacity(4);
        for i in 0..16 {
            assert!(lines.line("X-Seq", &i.to_string()).is_some());
        }
        assert_eq!(lines.cached(), 4);

        let mut redirect = ResponseContext::new(RequestId::new());
        redirect.redirect("/todos/123456789").unwrap();
        let out = redirect.into_outgoing();
        let written: Vec<&'static str> = out
            .headers
            .iter()
            .filter_map(|(name, value)| lines.line(name, value))
            .collect();
        assert!(written.contains(&"Location: /todos/123456789"), "{written:?}");
        assert_eq!(written.len(), out.headers.len());
    }

    #[test]
    fn test_line_breaks_are_rejected() {
        let lines = HeaderLines::with_capacity(4);
        assert_eq!(lines.line("Location", "/a\r\nX-Evil: 1"), None);
    }

    #[test]
    fn test_header_line_rejects_breaks() {
        assert_eq!(header_line("X-A", "1").as_deref(), Some("X-A: 1"));
        assert!(header_line("X-A", "1\r\nX-B: 2").is_none());
    }

    #[test]
    fn test_closure_is_a_sink() {
        let mut seen = Vec::new();
        let mut sink = |out: OutgoingResponse| -> io::Result<()> {
            seen.push(out.status);
            Ok(())
        };
        sink.write(OutgoingResponse::text(204, "")).unwrap();
        assert_eq!(seen, vec![204]);
    }
}
