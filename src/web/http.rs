//! Minimal HTTP/1.1 request reading and response writing.
//!
//! One request per connection: headers, then a `Content-Length` body. No
//! chunked transfer, no keep-alive.

use std::collections::HashMap;
use std::io::{Read, Write};

use anyhow::Result;
use thiserror::Error;

const MAX_HEADER_BYTES: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("request read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// Status code to answer with, if the connection is still usable.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::TooLarge { .. } => Some(413),
            RequestError::Malformed(_) => Some(400),
            RequestError::Io(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Non-empty path segments, e.g. `/frames/a/b.jpg` -> `["frames", "a", "b.jpg"]`.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Read one request, rejecting bodies larger than `max_body` before reading
/// them.
pub fn read_request<R: Read>(stream: &mut R, max_body: usize) -> Result<HttpRequest, RequestError> {
    let mut buf = [0u8; 8192];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = find(&data, b"\r\n\r\n", 0) {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(RequestError::Malformed("headers too large".to_string()));
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(RequestError::Malformed(
                "connection closed before end of headers".to_string(),
            ));
        }
        data.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| RequestError::Malformed("empty request".to_string()))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RequestError::Malformed("missing method".to_string()))?;
    let raw_path = parts
        .next()
        .ok_or_else(|| RequestError::Malformed("missing path".to_string()))?;
    if !raw_path.starts_with('/') {
        return Err(RequestError::Malformed(format!("bad path '{}'", raw_path)));
    }

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed(format!("bad content-length '{}'", value)))?,
        None => 0,
    };
    if content_length > max_body {
        return Err(RequestError::TooLarge { limit: max_body });
    }

    let mut body = data.split_off(header_end + 4);
    if body.len() > content_length {
        body.truncate(content_length);
    }
    while body.len() < content_length {
        let want = (content_length - body.len()).min(buf.len());
        let n = stream.read(&mut buf[..want])?;
        if n == 0 {
            return Err(RequestError::Malformed("body shorter than content-length".to_string()));
        }
        body.extend_from_slice(&buf[..n]);
    }

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        headers,
        body,
    })
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn file(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self::json(404, r#"{"error":"not_found"}"#)
    }

    pub fn method_not_allowed() -> Self {
        Self::json(405, r#"{"error":"method_not_allowed"}"#)
    }
}

pub fn write_response<W: Write>(stream: &mut W, response: &Response) -> Result<()> {
    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status = response.status,
        reason = reason_phrase(response.status),
        content_type = response.content_type,
        len = response.body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()?;
    Ok(())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}

/// Byte offset of `needle` in `haystack` at or after `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}
