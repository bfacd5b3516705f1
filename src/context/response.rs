use serde::Serialize;
use tracing::warn;

use crate::error::ResponseError;
use crate::ids::RequestId;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";
const APPLICATION_JSON: &str = "application/json";

/// Canonical reason phrase for a status code (`"Unknown"` when unregistered)
#[must_use]
pub fn reason_phrase(code: u16) -> &'static str {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Payload accepted by [`ResponseContext::send`].
///
/// Text payloads default to `text/plain`, binary ones to
/// `application/octet-stream`, unless a content type was already set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

impl Body {
    fn default_content_type(&self) -> &'static str {
        match self {
            Body::Text(_) => TEXT_PLAIN,
            Body::Binary(_) => OCTET_STREAM,
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Body::Text(s) => s.into_bytes(),
            Body::Binary(b) => b,
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Binary(b)
    }
}

impl From<&[u8]> for Body {
    fn from(b: &[u8]) -> Self {
        Body::Binary(b.to_vec())
    }
}

/// Attributes of a `Set-Cookie` line
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_string()),
            max_age: None,
            http_only: false,
            secure: false,
        }
    }
}

fn format_cookie(name: &str, value: &str, opts: &CookieOptions) -> String {
    let mut line = format!("{}={}", name, urlencoding::encode(value));
    if let Some(path) = &opts.path {
        line.push_str("; Path=");
        line.push_str(path);
    }
    if let Some(max_age) = opts.max_age {
        line.push_str(&format!("; Max-Age={max_age}"));
    }
    if opts.http_only {
        line.push_str("; HttpOnly");
    }
    if opts.secure {
        line.push_str("; Secure");
    }
    line
}

/// A finished response, ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutgoingResponse {
    /// Plain-text response with a single content-type header
    #[must_use]
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), TEXT_PLAIN.to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Case-insensitive header lookup
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response state for one request.
///
/// Non-terminal operations (`status`, `set_header`, `content_type`,
/// `cookie`) mutate state and are ignored once the response is sent.
/// Terminal operations (`json`, `send`, `send_status`, `redirect`) succeed
/// at most once; later attempts return [`ResponseError::AlreadySent`] and
/// leave the first response untouched.
#[derive(Debug)]
pub struct ResponseContext {
    request_id: RequestId,
    status: u16,
    headers: Vec<(String, String)>,
    set_cookies: Vec<String>,
    body: Vec<u8>,
    sent: bool,
}

impl ResponseContext {
    pub(crate) fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            status: 200,
            headers: Vec::new(),
            set_cookies: Vec::new(),
            body: Vec::new(),
            sent: false,
        }
    }

    fn ignored_after_send(&self, op: &'static str) -> bool {
        if self.sent {
            warn!(
                request_id = %self.request_id,
                operation = op,
                "Response already sent - operation ignored"
            );
        }
        self.sent
    }

    /// Set the status code
    pub fn status(&mut self, code: u16) -> &mut Self {
        if !self.ignored_after_send("status") {
            self.status = code;
        }
        self
    }

    /// Set a header, replacing any earlier value under the same
    /// (case-insensitive) name. Values containing CR or LF are dropped.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        if self.ignored_after_send("set_header") {
            return self;
        }
        if [name, value]
            .iter()
            .any(|s| s.contains(['\r', '\n']))
        {
            warn!(request_id = %self.request_id, header = name, "Header with line break dropped");
            return self;
        }
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        if !self.ignored_after_send("remove_header") {
            self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
        self
    }

    /// Set `Content-Type`
    pub fn content_type(&mut self, mime: &str) -> &mut Self {
        self.set_header("Content-Type", mime)
    }

    /// Add a cookie with `Path=/`
    pub fn cookie(&mut self, name: &str, value: &str) -> &mut Self {
        self.cookie_with(name, value, &CookieOptions::default())
    }

    pub fn cookie_with(&mut self, name: &str, value: &str, opts: &CookieOptions) -> &mut Self {
        if self.ignored_after_send("cookie") {
            return self;
        }
        if name.is_empty() || name.contains([';', '=', ' ', '\r', '\n']) {
            warn!(request_id = %self.request_id, cookie = name, "Invalid cookie name dropped");
            return self;
        }
        self.set_cookies.push(format_cookie(name, value, opts));
        self
    }

    /// Expire a cookie on the client
    pub fn clear_cookie(&mut self, name: &str) -> &mut Self {
        let opts = CookieOptions {
            max_age: Some(0),
            ..CookieOptions::default()
        };
        self.cookie_with(name, "", &opts)
    }

    fn begin_terminal(&mut self, attempted: &'static str) -> Result<(), ResponseError> {
        if self.sent {
            warn!(
                request_id = %self.request_id,
                attempted = attempted,
                status = self.status,
                "Second terminal write rejected - first response stands"
            );
            return Err(ResponseError::AlreadySent { attempted });
        }
        Ok(())
    }

    fn finish(&mut self, body: Vec<u8>) {
        self.body = body;
        self.sent = true;
    }

    fn has_content_type(&self) -> bool {
        self.header("content-type").is_some()
    }

    /// Serialize `value` as JSON and send it.
    ///
    /// # Errors
    ///
    /// [`ResponseError::AlreadySent`] after an earlier terminal write, or
    /// [`ResponseError::Serialize`] if the value cannot be encoded (nothing
    /// is sent in that case).
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ResponseError> {
        self.begin_terminal("json")?;
        let bytes =
            serde_json::to_vec(value).map_err(|e| ResponseError::Serialize(e.to_string()))?;
        self.content_type(APPLICATION_JSON);
        self.finish(bytes);
        Ok(())
    }

    /// Send a text or binary payload.
    ///
    /// # Errors
    ///
    /// [`ResponseError::AlreadySent`] after an earlier terminal write.
    pub fn send(&mut self, body: impl Into<Body>) -> Result<(), ResponseError> {
        self.begin_terminal("send")?;
        let body = body.into();
        if !self.has_content_type() {
            self.content_type(body.default_content_type());
        }
        self.finish(body.into_bytes());
        Ok(())
    }

    /// Send `code` with its reason phrase as a plain-text body.
    ///
    /// # Errors
    ///
    /// [`ResponseError::AlreadySent`] after an earlier terminal write.
    pub fn send_status(&mut self, code: u16) -> Result<(), ResponseError> {
        self.begin_terminal("send_status")?;
        self.status = code;
        self.content_type(TEXT_PLAIN);
        self.finish(reason_phrase(code).as_bytes().to_vec());
        Ok(())
    }

    /// `302 Found` to `location`.
    ///
    /// # Errors
    ///
    /// [`ResponseError::AlreadySent`] after an earlier terminal write.
    pub fn redirect(&mut self, location: &str) -> Result<(), ResponseError> {
        self.redirect_with(302, location)
    }

    /// # Errors
    ///
    /// [`ResponseError::AlreadySent`] after an earlier terminal write.
    pub fn redirect_with(&mut self, code: u16, location: &str) -> Result<(), ResponseError> {
        self.begin_terminal("redirect")?;
        self.status = code;
        self.set_header("Location", location);
        self.finish(Vec::new());
        Ok(())
    }

    /// Turn an unsent response into the fixed 500 error.
    ///
    /// Returns `false` and leaves the response alone if it was already sent.
    pub(crate) fn fault(&mut self) -> bool {
        if self.sent {
            return false;
        }
        self.status = 500;
        self.headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        self.headers
            .push(("Content-Type".to_string(), APPLICATION_JSON.to_string()));
        self.finish(br#"{"error":"Internal Server Error"}"#.to_vec());
        true
    }

    /// Status the client receives once the chain returns. An unsent response
    /// is replaced by the 500 fault response when the chain `failed`.
    #[must_use]
    pub fn final_status(&self, failed: bool) -> u16 {
        if failed && !self.sent {
            500
        } else {
            self.status
        }
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Case-insensitive lookup of a header set so far
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Finalize into the wire response. Cookies become separate
    /// `Set-Cookie` headers after the regular ones.
    #[must_use]
    pub fn into_outgoing(self) -> OutgoingResponse {
        let mut headers = self.headers;
        headers.extend(
            self.set_cookies
                .into_iter()
                .map(|c| ("Set-Cookie".to_string(), c)),
        );
        OutgoingResponse {
            status: self.status,
            headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn res() -> ResponseContext {
        ResponseContext::new(RequestId::new())
    }

    #[test]
    fn test_json_sets_content_type_and_status() {
        let mut r = res();
        r.status(201).json(&json!({"id": 1})).unwrap();
        assert!(r.is_sent());
        let out = r.into_outgoing();
        assert_eq!(out.status, 201);
        assert_eq!(out.header("content-type"), Some("application/json"));
        assert_eq!(out.body, br#"{"id":1}"#);
    }

    #[test]
    fn test_second_terminal_write_rejected() {
        let mut r = res();
        r.send("first").unwrap();
        let err = r.json(&json!({"x": 1})).unwrap_err();
        assert!(matches!(err, ResponseError::AlreadySent { attempted: "json" }));
        assert!(r.send_status(418).is_err());
        assert!(r.redirect("/elsewhere").is_err());
        assert_eq!(r.body(), b"first");
        assert_eq!(r.status_code(), 200);
    }

    #[test]
    fn test_final_status_reflects_fault_replacement() {
        let mut r = res();
        r.status(202);
        assert_eq!(r.final_status(false), 202);
        assert_eq!(r.final_status(true), 500);
        r.send_status(201).unwrap();
        assert_eq!(r.final_status(true), 201);
    }

    #[test]
    fn test_non_terminal_ops_ignored_after_send() {
        let mut r = res();
        r.send_status(404).unwrap();
        r.status(200).set_header("X-Late", "1").cookie("late", "1");
        let out = r.into_outgoing();
        assert_eq!(out.status, 404);
        assert_eq!(out.header("x-late"), None);
        assert_eq!(out.header("set-cookie"), None);
        assert_eq!(out.body, b"Not Found");
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut r = res();
        r.set_header("X-Trace", "a").set_header("x-trace", "b");
        assert_eq!(r.headers().len(), 1);
        assert_eq!(r.header("X-TRACE"), Some("b"));
    }

    #[test]
    fn test_header_injection_dropped() {
        let mut r = res();
        r.set_header("X-Evil", "a\r\nSet-Cookie: x=y");
        assert_eq!(r.header("x-evil"), None);
    }

    #[test]
    fn test_send_respects_explicit_type() {
        let mut r = res();
        r.content_type("text/html").send("<p>hi</p>").unwrap();
        assert_eq!(r.header("content-type"), Some("text/html"));

        let mut b = res();
        b.send(vec![0u8, 1, 2]).unwrap();
        assert_eq!(b.header("content-type"), Some("application/octet-stream"));
    }

    #[test]
    fn test_redirect() {
        let mut r = res();
        r.redirect("/hello").unwrap();
        let out = r.into_outgoing();
        assert_eq!(out.status, 302);
        assert_eq!(out.header("location"), Some("/hello"));
        assert!(out.body.is_empty());
    }

    #[test]
    fn test_cookies_become_set_cookie_lines() {
        let mut r = res();
        r.cookie("session", "a b");
        r.cookie_with(
            "pref",
            "dark",
            &CookieOptions {
                path: None,
                max_age: Some(60),
                http_only: true,
                secure: true,
            },
        );
        r.clear_cookie("old");
        let out = r.into_outgoing();
        let lines: Vec<_> = out
            .headers
            .iter()
            .filter(|(k, _)| k == "Set-Cookie")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(
            lines,
            vec![
                "session=a%20b; Path=/",
                "pref=dark; Max-Age=60; HttpOnly; Secure",
                "old=; Path=/; Max-Age=0",
            ]
        );
    }

    #[test]
    fn test_fault_replaces_content_type() {
        let mut r = res();
        r.content_type("text/html").set_header("X-A", "1");
        assert!(r.fault());
        assert!(!r.fault());
        let out = r.into_outgoing();
        assert_eq!(out.status, 500);
        assert_eq!(out.header("content-type"), Some("application/json"));
        assert_eq!(out.header("x-a"), Some("1"));
        assert_eq!(out.body, br#"{"error":"Internal Server Error"}"#);
    }

    #[test]
    fn test_fault_keeps_sent_response() {
        let mut r = res();
        r.send("done").unwrap();
        assert!(!r.fault());
        assert_eq!(r.status_code(), 200);
    }

    #[test]
    fn test_reason_phrase() {
        assert_eq!(reason_phrase(401), "Unauthorized");
        assert_eq!(reason_phrase(299), "Unknown");
    }
}
