//! HTTP/1.x request reading
//!
//! A [`RequestReader`] owns the read half of a connection and a carry-over
//! buffer, so bytes of a pipelined next request are never lost. The head is
//! read first; the caller then decides (limits, `Expect: 100-continue`)
//! before asking for the body.

use std::error::Error;
use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::http_response::HttpResponse;
use super::http_version::HttpVersion;

const READ_CHUNK: usize = 8 * 1024;

/// Why a request could not be read
#[derive(Debug)]
pub enum RequestError {
    Io(io::Error),
    /// The peer closed the connection in the middle of a request
    UnexpectedEof,
    Malformed(&'static str),
    HeadTooLarge { limit: usize },
    BodyTooLarge { limit: u64 },
    UnsupportedVersion,
    UnsupportedTransferEncoding,
}

impl RequestError {
    /// The response owed to the client, if the connection can still carry one
    pub fn to_response(&self) -> Option<HttpResponse> {
        let response = match self {
            RequestError::Io(_) | RequestError::UnexpectedEof => return None,
            RequestError::Malformed(_) => HttpResponse::message(400, "Malformed request."),
            RequestError::HeadTooLarge { .. } => {
                HttpResponse::message(431, "Request headers are too large.")
            }
            RequestError::BodyTooLarge { limit } => HttpResponse::message(
                413,
                &format!("Request body exceeds the {} limit.", format_limit(*limit)),
            ),
            RequestError::UnsupportedVersion => {
                HttpResponse::message(505, "HTTP version not supported.")
            }
            RequestError::UnsupportedTransferEncoding => {
                HttpResponse::message(501, "Transfer-Encoding is not supported.")
            }
        };
        Some(response)
    }
}

/// Whole MiB when the limit is at least one MiB, bytes otherwise
fn format_limit(limit: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if limit >= MIB {
        format!("{} MiB", limit / MIB)
    } else {
        format!("{} byte", limit)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Io(e) => write!(f, "read failed: {}", e),
            RequestError::UnexpectedEof => write!(f, "connection closed mid-request"),
            RequestError::Malformed(what) => write!(f, "malformed request: {}", what),
            RequestError::HeadTooLarge { limit } => write!(f, "request head over {} bytes", limit),
            RequestError::BodyTooLarge { limit } => write!(f, "request body over {} bytes", limit),
            RequestError::UnsupportedVersion => write!(f, "unsupported HTTP version"),
            RequestError::UnsupportedTransferEncoding => write!(f, "unsupported Transfer-Encoding"),
        }
    }
}

impl Error for RequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RequestError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RequestError {
    fn from(e: io::Error) -> Self {
        RequestError::Io(e)
    }
}

/// Request line and headers. Header names are stored lowercase.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub query: String,
    pub version: HttpVersion,
    pub headers: Vec<(String, String)>,
    pub content_length: u64,
}

impl RequestHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the client waits for `100 Continue` before sending the body
    pub fn expects_continue(&self) -> bool {
        self.version.supports_continue()
            && self
                .header("expect")
                .is_some_and(|value| value.eq_ignore_ascii_case("100-continue"))
    }

    pub fn into_request(self, body: Vec<u8>) -> Request {
        Request {
            method: self.method,
            path: self.path,
            query: self.query,
            version: self.version,
            headers: self.headers,
            body,
        }
    }
}

/// A fully read request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: String,
    pub version: HttpVersion,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Parse a request head (without the terminating blank line)
pub fn parse_head(raw: &[u8]) -> Result<RequestHead, RequestError> {
    let text = std::str::from_utf8(raw).map_err(|_| RequestError::Malformed("head is not UTF-8"))?;
    // Stray CRLFs before the request line are tolerated.
    let text = text.trim_start_matches("\r\n");
    let mut lines = text.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut tokens = request_line.split(' ');
    let (method, target, version) = match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
        (Some(method), Some(target), Some(version), None) => (method, target, version),
        _ => return Err(RequestError::Malformed("bad request line")),
    };

    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(RequestError::Malformed("bad method"));
    }
    if !target.starts_with('/') {
        return Err(RequestError::Malformed("request target must be origin-form"));
    }
    let version = HttpVersion::from_token(version).ok_or(RequestError::UnsupportedVersion)?;

    let mut headers = Vec::new();
    for line in lines {
        if line.starts_with(' ') || line.starts_with('\t') {
            return Err(RequestError::Malformed("folded header"));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or(RequestError::Malformed("header without colon"))?;
        if name.is_empty() || name.contains(|c: char| c.is_ascii_whitespace()) {
            return Err(RequestError::Malformed("bad header name"));
        }
        headers.push((name.to_ascii_lowercase(), value.trim().to_string()));
    }

    if let Some(encoding) = find_header(&headers, "transfer-encoding") {
        if !encoding.eq_ignore_ascii_case("identity") {
            return Err(RequestError::UnsupportedTransferEncoding);
        }
    }

    let mut content_length = None;
    for (_, value) in headers.iter().filter(|(name, _)| name == "content-length") {
        let length: u64 = value
            .parse()
            .map_err(|_| RequestError::Malformed("bad Content-Length"))?;
        if content_length.is_some_and(|existing| existing != length) {
            return Err(RequestError::Malformed("conflicting Content-Length"));
        }
        content_length = Some(length);
    }

    let target = target.split('#').next().unwrap_or_default();
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    Ok(RequestHead {
        method: method.to_string(),
        path: path.to_string(),
        query: query.to_string(),
        version,
        headers,
        content_length: content_length.unwrap_or(0),
    })
}

/// Reads successive requests from one connection
pub struct RequestReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    /// Read the next request head
    ///
    /// # Returns
    /// * `Ok(None)` - the peer closed the connection between requests
    pub async fn read_head(&mut self, max_head_bytes: usize) -> Result<Option<RequestHead>, RequestError> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut searched = 0;

        loop {
            if let Some(end) = find_terminator(&self.buffer, searched) {
                if end > max_head_bytes {
                    return Err(RequestError::HeadTooLarge { limit: max_head_bytes });
                }
                let raw: Vec<u8> = self.buffer.drain(..end + 4).collect();
                return parse_head(&raw[..end]).map(Some);
            }
            if self.buffer.len() > max_head_bytes {
                return Err(RequestError::HeadTooLarge { limit: max_head_bytes });
            }
            // The terminator may straddle the next read.
            searched = self.buffer.len().saturating_sub(3);

            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                if self.buffer.iter().all(|b| *b == b'\r' || *b == b'\n') {
                    return Ok(None);
                }
                return Err(RequestError::UnexpectedEof);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Read the body announced by `head`, refusing anything over `max_body_bytes`
    pub async fn read_body(&mut self, head: &RequestHead, max_body_bytes: u64) -> Result<Vec<u8>, RequestError> {
        if head.content_length > max_body_bytes {
            return Err(RequestError::BodyTooLarge { limit: max_body_bytes });
        }
        // Bounded by max_body_bytes above.
        let length = head.content_length as usize;

        let from_buffer = length.min(self.buffer.len());
        let mut body: Vec<u8> = Vec::with_capacity(length.min(1024 * 1024));
        body.extend(self.buffer.drain(..from_buffer));

        let mut chunk = [0u8; READ_CHUNK];
        while body.len() < length {
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Err(RequestError::UnexpectedEof);
            }
            let wanted = (length - body.len()).min(n);
            body.extend_from_slice(&chunk[..wanted]);
            self.buffer.extend_from_slice(&chunk[wanted..n]);
        }

        Ok(body)
    }
}

fn find_terminator(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|offset| from + offset)
}
