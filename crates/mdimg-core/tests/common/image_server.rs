//! Minimal HTTP/1.1 server for integration tests.
//!
//! Each path has a scripted list of responses served in order; the last one
//! repeats once the script runs out. Unknown paths get 404. Every connection
//! is closed after one response.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
    /// Pause after sending half the body.
    pub stall: Option<Duration>,
}

impl Reply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            headers: Vec::new(),
            stall: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            headers: Vec::new(),
            stall: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sends the headers and half the body, then waits `pause` before the rest.
    pub fn stalled(mut self, pause: Duration) -> Self {
        self.stall = Some(pause);
        self
    }
}

#[derive(Default)]
struct Route {
    script: Vec<Reply>,
    hits: usize,
}

/// Running server. Routes may be added after start.
#[derive(Clone)]
pub struct ImageServer {
    base: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
}

impl ImageServer {
    /// Starts a server on an ephemeral port. It runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let shared = Arc::clone(&routes);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &routes));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            routes,
        }
    }

    /// Serves `script` at `path` (which must start with `/`).
    pub fn route(&self, path: &str, script: Vec<Reply>) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                script,
                hits: 0,
            },
        );
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Requests received for `path` so far.
    pub fn hits(&self, path: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .get(path)
            .map_or(0, |r| r.hits)
    }
}

fn handle(mut stream: TcpStream, routes: &Mutex<HashMap<String, Route>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path) = parse_request_line(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    let reply = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(route) => {
                let i = route.hits.min(route.script.len().saturating_sub(1));
                route.hits += 1;
                route.script.get(i).cloned().unwrap_or_else(|| Reply::status(404))
            }
            None => Reply::status(404),
        }
    };

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reason(reply.status),
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    match reply.stall {
        Some(pause) => {
            let (first, rest) = reply.body.split_at(reply.body.len() / 2);
            let _ = stream.write_all(first);
            let _ = stream.flush();
            thread::sleep(pause);
            let _ = stream.write_all(rest);
        }
        None => {
            let _ = stream.write_all(&reply.body);
        }
    }
}

/// Returns (method, path without query) from the request line.
fn parse_request_line(request: &str) -> (&str, &str) {
    let line = request.lines().next().unwrap_or("");
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);
    (method, path)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Status",
    }
}
