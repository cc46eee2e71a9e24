//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a single static body on every path except `/moved`, which
//! redirects to `/doc.pdf`. Counts GET requests so tests can assert how often
//! the network was hit. Behavior knobs simulate error statuses, bodies cut
//! off mid-stream and stalled transfers.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct DocServerOptions {
    /// Status line code for GET responses.
    pub status: u16,
    /// If set, advertise the full Content-Length but close after this many body bytes.
    pub truncate_after: Option<usize>,
    /// If set, send headers and the first half of the body, then go silent for this long.
    pub stall_for: Option<Duration>,
}

impl Default for DocServerOptions {
    fn default() -> Self {
        Self {
            status: 200,
            truncate_after: None,
            stall_for: None,
        }
    }
}

pub struct DocServer {
    base: String,
    hits: Arc<AtomicUsize>,
}

impl DocServer {
    /// URL for `path` on this server (e.g. `url("doc.pdf")`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Number of GET requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`. Runs until the process exits.
pub fn start(body: Vec<u8>) -> DocServer {
    start_with_options(body, DocServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: DocServerOptions) -> DocServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_srv = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let hits = Arc::clone(&hits_srv);
            thread::spawn(move || handle(stream, &body, opts, &hits));
        }
    });
    DocServer {
        base: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

fn handle(mut stream: TcpStream, body: &[u8], opts: DocServerOptions, hits: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path) = parse_request_line(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    hits.fetch_add(1, Ordering::SeqCst);

    if path == "/moved" {
        let _ = stream.write_all(
            b"HTTP/1.1 302 Found\r\nLocation: /doc.pdf\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }

    if opts.status != 200 {
        let msg = b"not here";
        let head = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            opts.status,
            msg.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(msg);
        return;
    }

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());

    if let Some(stall) = opts.stall_for {
        let _ = stream.write_all(&body[..body.len() / 2]);
        let _ = stream.flush();
        thread::sleep(stall);
        return;
    }
    let sent = opts.truncate_after.unwrap_or(body.len()).min(body.len());
    let _ = stream.write_all(&body[..sent]);
    let _ = stream.flush();
}

/// Returns (method, path) from the request line.
fn parse_request_line(request: &str) -> (&str, &str) {
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/");
    (method, path)
}
