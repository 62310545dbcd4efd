//! Minimal HTTP/1.1 server for integration tests: serves one body with a
//! configurable status, content type, and optional 301 redirect hop, and
//! counts the requests it saw.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
pub struct IconServerOptions {
    /// Status for the default response.
    pub status: u16,
    /// Content-Type for the default response.
    pub content_type: String,
    /// When set, any other path 301-redirects to this path, which then
    /// serves the body with 200.
    pub redirect_to: Option<String>,
}

impl Default for IconServerOptions {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: "image/png".to_string(),
            redirect_to: None,
        }
    }
}

pub struct IconServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl IconServer {
    /// Number of requests handled so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body` with 200/image-png.
/// The server runs until the process exits.
pub fn start(body: Vec<u8>) -> IconServer {
    start_with_options(body, IconServerOptions::default())
}

/// Like `start` but with custom status/content-type/redirect behavior.
pub fn start_with_options(body: Vec<u8>, opts: IconServerOptions) -> IconServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}", port);
    let body = Arc::new(body);
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = Arc::clone(&hits);
    let server_base = base.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = opts.clone();
            let hits = Arc::clone(&server_hits);
            let base = server_base.clone();
            thread::spawn(move || handle(stream, &body, &opts, &hits, &base));
        }
    });
    IconServer {
        url: format!("{}/", base),
        hits,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: &IconServerOptions,
    hits: &AtomicUsize,
    base: &str,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
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
    let path = match request_path(request) {
        Some(p) => p,
        None => return,
    };
    hits.fetch_add(1, Ordering::SeqCst);

    if let Some(target) = &opts.redirect_to {
        if path != *target {
            let response = format!(
                "HTTP/1.1 301 Moved Permanently\r\nLocation: {}{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                base, target
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        // Redirect target always serves the body.
        let _ = stream.write_all(response_head(200, "image/png", body.len()).as_bytes());
        let _ = stream.write_all(body);
        return;
    }

    let _ = stream.write_all(response_head(opts.status, &opts.content_type, body.len()).as_bytes());
    let _ = stream.write_all(body);
}

fn response_head(status: u16, content_type: &str, length: usize) -> String {
    let reason = match status {
        200 => "OK",
        301 => "Moved Permanently",
        404 => "Not Found",
        _ => "Status",
    };
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, reason, content_type, length
    )
}

/// Path from the request line, e.g. "/favicon.ico".
fn request_path(request: &str) -> Option<String> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let _method = parts.next()?;
    parts.next().map(|p| p.to_string())
}
