//! Per-request forwarding trace.
//!
//! One `Trace` is created per request, filled in by the forwarding call
//! chain for that request only, rendered once for the debug log, then
//! dropped. Rendering is where bodies become human-readable: textual
//! content types are shown as text (gzip-encoded ones decompressed
//! first), anything else as a bracketed placeholder with its size.

use std::io::Read;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, Method, StatusCode};
use flate2::read::GzDecoder;
use humansize::{format_size, BINARY};

use crate::forward::ForwardError;

/// Decompression output buffers are pooled for allocation efficiency.
/// Each buffer is cleared before use and returned right after, so no
/// request ever observes another's data.
static BUFFER_POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

const BUFFER_POOL_LIMIT: usize = 8;

fn decompress(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut buf = BUFFER_POOL
        .lock()
        .ok()
        .and_then(|mut pool| pool.pop())
        .unwrap_or_default();
    buf.clear();

    let result = GzDecoder::new(body).read_to_end(&mut buf);
    let output = result.map(|_| buf.as_slice().to_vec());

    if let Ok(mut pool) = BUFFER_POOL.lock() {
        if pool.len() < BUFFER_POOL_LIMIT {
            pool.push(buf);
        }
    }

    output
}

/// Everything observed during one forwarding attempt.
#[derive(Debug)]
pub struct Trace {
    pub start: Instant,
    pub duration: Duration,
    /// Inbound host + path.
    pub request_url: String,
    pub backend_url: String,
    pub method: Method,
    pub status: Option<StatusCode>,
    pub error: Option<ForwardError>,

    pub request_headers: HeaderMap,
    pub transit_headers: HeaderMap,
    pub response_headers: HeaderMap,
    pub request_body: Bytes,
    pub response_body: Bytes,
}

impl Trace {
    /// Start a trace for one inbound request.
    pub fn begin(method: Method, host: &str, path: &str, mut request_headers: HeaderMap) -> Self {
        // Host is already part of request_url and is never forwarded,
        // so it stays out of the header comparison too.
        request_headers.remove(HOST);
        Self {
            start: Instant::now(),
            duration: Duration::ZERO,
            request_url: format!("{}{}", host, path),
            backend_url: String::new(),
            method,
            status: None,
            error: None,
            request_headers,
            transit_headers: HeaderMap::new(),
            response_headers: HeaderMap::new(),
            request_body: Bytes::new(),
            response_body: Bytes::new(),
        }
    }

    /// Record the terminal error, leaving the rest of the trace intact.
    pub fn fail(&mut self, error: ForwardError) {
        self.error = Some(error);
    }

    /// Render the trace as a single diagnostic line.
    pub fn render(&self) -> String {
        let req_headers = header_lines(&self.request_headers);
        let trs_headers = header_lines(&self.transit_headers);
        let rsp_headers = header_lines(&self.response_headers);
        let req_body = render_body(&self.request_headers, &self.request_body);
        let rsp_body = render_body(&self.response_headers, &self.response_body);

        let mut line = format!(
            "{} {} -> {} | time: {:?} | status: {}",
            self.method,
            self.request_url,
            self.backend_url,
            self.duration,
            self.status.map(|s| s.as_u16()).unwrap_or(0),
        );

        if !req_headers.is_empty() {
            line.push_str(&format!(" | req headers: {}", req_headers));
        }
        if !trs_headers.is_empty() && trs_headers != req_headers {
            line.push_str(&format!(" | transit headers: {}", trs_headers));
        }
        if !req_body.is_empty() {
            line.push_str(&format!(" | req body: {}", req_body));
        }
        if !rsp_headers.is_empty() {
            line.push_str(&format!(" | resp headers: {}", rsp_headers));
        }
        if !rsp_body.is_empty() {
            line.push_str(&format!(" | resp body: {}", rsp_body));
        }

        line
    }
}

/// `"name: v1,v2"` per header, lexicographically sorted, `"; "`-joined.
fn header_lines(headers: &HeaderMap) -> String {
    let mut lines: Vec<String> = headers
        .keys()
        .map(|name| {
            let values = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            format!("{}: {}", name, values)
        })
        .collect();
    lines.sort();
    lines.join("; ")
}

fn is_textual(content_type: &str) -> bool {
    let ct = content_type.to_lowercase();
    ct.contains("application/json")
        || ct.contains("application/x-www-form-urlencoded")
        || ct.contains("text/")
}

fn render_body(headers: &HeaderMap, body: &[u8]) -> String {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if is_textual(content_type) {
        let encoding = headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if encoding.to_lowercase().contains("gzip") {
            match decompress(body) {
                Ok(text) => String::from_utf8_lossy(&text).into_owned(),
                Err(_) => format!(
                    "[gzip {} {}]",
                    content_type,
                    format_size(body.len(), BINARY)
                ),
            }
        } else {
            String::from_utf8_lossy(body).into_owned()
        }
    } else if !content_type.is_empty() && !body.is_empty() {
        format!("[{} {}]", content_type, format_size(body.len(), BINARY))
    } else {
        String::new()
    }
}
