use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};

use tracing::debug;

/// Parse a `Cookie` header value into name/value pairs.
///
/// Values are percent-decoded when they decode cleanly. Later pairs win.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let raw = parts.next().unwrap_or("").trim();
            let value = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            Some((name.to_string(), value))
        })
        .collect()
}

/// Parse a raw query string (without the `?`). Repeated keys: last wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Transport-neutral view of one HTTP request.
///
/// Header names are stored lowercased. The body is an optional stream that
/// is only read if body parsing is enabled, so a request can be handled
/// without buffering its payload.
pub struct IncomingRequest<'a> {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    body: Option<Box<dyn Read + 'a>>,
}

impl fmt::Debug for IncomingRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl<'a> IncomingRequest<'a> {
    /// Build from a method and request target (`/path?query`).
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        let path = if path.is_empty() { "/" } else { path };
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: query.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Attach an in-memory body
    #[must_use]
    pub fn with_body(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.with_body_reader(io::Cursor::new(bytes.into()))
    }

    /// Attach a streaming body
    #[must_use]
    pub fn with_body_reader<R: Read + 'a>(mut self, reader: R) -> Self {
        self.body = Some(Box::new(reader));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Absolute path, query stripped
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string without the `?`
    pub fn query_string(&self) -> &str {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Last value of a header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Headers as a flat map, last value wins
    pub fn header_map(&self) -> HashMap<String, String> {
        self.headers.iter().cloned().collect()
    }

    pub fn query_map(&self) -> HashMap<String, String> {
        parse_query(&self.query)
    }

    /// Cookies from every `Cookie` header, in order, last value wins
    pub fn cookie_map(&self) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        for (_, value) in self.headers.iter().filter(|(k, _)| k == "cookie") {
            cookies.extend(parse_cookies(value));
        }
        cookies
    }

    /// A body stream is present and `content-length` is absent or non-zero.
    pub fn declares_body(&self) -> bool {
        if self.body.is_none() {
            return false;
        }
        match self.header("content-length") {
            Some(len) => len.trim().parse::<u64>().map_or(true, |n| n > 0),
            None => true,
        }
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut (dyn Read + 'a)> {
        self.body.as_deref_mut()
    }

    /// Read and discard whatever is left of the body stream so the
    /// connection can carry the next request.
    pub fn drain_body(&mut self) {
        if let Some(mut body) = self.body.take() {
            match io::copy(&mut body, &mut io::sink()) {
                Ok(0) => {}
                Ok(n) => debug!(drained_bytes = n, "Unread request body drained"),
                Err(e) => debug!(error = %e, "Request body drain failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("a=1; b=hello%20world; c; a=2");
        assert_eq!(cookies.get("a").map(String::as_str), Some("2"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("hello world"));
        assert_eq!(cookies.get("c").map(String::as_str), Some(""));
    }

    #[test]
    fn test_parse_query_last_wins() {
        let q = parse_query("page=1&page=2&name=J%C3%BCrgen&flag");
        assert_eq!(q.get("page").map(String::as_str), Some("2"));
        assert_eq!(q.get("name").map(String::as_str), Some("Jürgen"));
        assert_eq!(q.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_target_split() {
        let req = IncomingRequest::new("GET", "/search?q=rust");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_string(), "q=rust");

        let bare = IncomingRequest::new("GET", "?x=1");
        assert_eq!(bare.path(), "/");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = IncomingRequest::new("GET", "/")
            .with_header("X-Token", "a")
            .with_header("x-token", "b");
        assert_eq!(req.header("X-TOKEN"), Some("b"));
        assert_eq!(req.header_map().get("x-token").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_cookies_from_multiple_headers() {
        let req = IncomingRequest::new("GET", "/")
            .with_header("Cookie", "a=1; b=2")
            .with_header("Cookie", "b=3");
        let cookies = req.cookie_map();
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_declares_body() {
        assert!(!IncomingRequest::new("POST", "/").declares_body());
        assert!(IncomingRequest::new("POST", "/").with_body("x").declares_body());
        let empty = IncomingRequest::new("POST", "/")
            .with_header("Content-Length", "0")
            .with_body(Vec::new());
        assert!(!empty.declares_body());
    }
}
