#![allow(dead_code)]

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::{Duration, Instant};

    #[derive(Debug)]
    pub struct ParsedResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl ParsedResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn header_values(&self, name: &str) -> Vec<&str> {
            self.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
                .collect()
        }
    }

    fn content_length(head: &str) -> Option<usize> {
        head.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
    }

    /// Send a raw HTTP/1.1 request and read one response.
    ///
    /// Reading stops once `Content-Length` bytes of body have arrived or the
    /// deadline passes.
    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(3);
        let mut buf = Vec::new();
        while Instant::now() < deadline {
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => panic!("read error: {e:?}"),
            }
            let text = String::from_utf8_lossy(&buf);
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                if body.len() >= content_length(head).unwrap_or(0) {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn parse_response(resp: &str) -> ParsedResponse {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        ParsedResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    pub fn get(addr: &SocketAddr, path: &str) -> ParsedResponse {
        let req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        parse_response(&send_request(addr, &req))
    }

    pub fn send_json(addr: &SocketAddr, method: &str, path: &str, body: &str) -> ParsedResponse {
        let req = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        parse_response(&send_request(addr, &req))
    }
}

pub mod test_server {
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// A local address that was free a moment ago
    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }
}

pub mod dispatch {
    use brrtexpress::{DispatchOutcome, Dispatcher, IncomingRequest, OutgoingResponse};

    /// Dispatch through the sink interface and record every write.
    pub fn run(
        dispatcher: &Dispatcher,
        mut incoming: IncomingRequest<'_>,
    ) -> (DispatchOutcome, Vec<OutgoingResponse>) {
        let mut writes = Vec::new();
        let outcome = dispatcher
            .handle(&mut incoming, &mut |out: OutgoingResponse| -> std::io::Result<()> {
                writes.push(out);
                Ok(())
            })
            .unwrap();
        (outcome, writes)
    }

    /// Dispatch and return the single response, asserting it was written once.
    pub fn single(dispatcher: &Dispatcher, incoming: IncomingRequest<'_>) -> (DispatchOutcome, OutgoingResponse) {
        let (outcome, mut writes) = run(dispatcher, incoming);
        assert_eq!(writes.len(), 1, "expected exactly one response write");
        (outcome, writes.remove(0))
    }

    pub fn body_text(out: &OutgoingResponse) -> String {
        String::from_utf8_lossy(&out.body).to_string()
    }
}

pub mod services {
    use brrtexpress::context::{ServiceProvider, ServiceRef, ServiceScope};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Provider that counts scopes created and disposed
    #[derive(Default)]
    pub struct CountingProvider {
        pub created: Arc<AtomicUsize>,
        pub disposed: Arc<AtomicUsize>,
    }

    impl CountingProvider {
        pub fn created(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }

        pub fn disposed(&self) -> usize {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    struct CountingScope {
        disposed: Arc<AtomicUsize>,
    }

    impl ServiceScope for CountingScope {
        fn get(&self, key: &str) -> Option<ServiceRef> {
            (key == "answer").then(|| Arc::new(42u32) as ServiceRef)
        }

        fn dispose(&mut self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ServiceProvider for CountingProvider {
        fn create_scope(&self) -> Box<dyn ServiceScope> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Box::new(CountingScope {
                disposed: Arc::clone(&self.disposed),
            })
        }
    }
}
