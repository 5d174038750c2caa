//! HTTP Response Builder
//!
//! Responses are built by the portal handlers and encoded here for the
//! HTTP version of the request they answer.

use serde::Serialize;

use super::http_version::HttpVersion;

/// Standard reason phrase for the status codes the portal emits
pub fn reason_phrase(status_code: u16) -> &'static str {
    match status_code {
        100 => "Continue",
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

/// Body shape shared by every error and most success responses
#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub message: &'a str,
}

/// HTTP response representation
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500)
    pub status_code: u16,
    /// HTTP status text (e.g., "OK", "Not Found", "Internal Server Error")
    pub status_text: String,
    /// HTTP headers, in the order they are written
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response with the standard reason phrase
    pub fn new(status_code: u16, body: Vec<u8>) -> Self {
        Self {
            status_code,
            status_text: reason_phrase(status_code).to_string(),
            headers: Vec::new(),
            body,
        }
    }

    /// Create a `text/html` response, the way the liveness route answers
    pub fn text(status_code: u16, text: &str) -> Self {
        let mut response = Self::new(status_code, text.as_bytes().to_vec());
        response.set_content_type("text/html; charset=utf-8");
        response
    }

    /// Create an `application/json` response from any serializable value
    ///
    /// Serialization of the portal's own body types cannot fail; should it
    /// ever, the client gets a bare 500 instead of a half-written body.
    pub fn json<T: Serialize>(status_code: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                let mut response = Self::new(status_code, body);
                response.set_content_type("application/json; charset=utf-8");
                response
            }
            Err(e) => {
                log::error!("Failed to serialize response body: {}", e);
                Self::new(500, Vec::new())
            }
        }
    }

    /// Create a `{"message": ...}` JSON response
    pub fn message(status_code: u16, message: &str) -> Self {
        Self::json(status_code, &MessageBody { message })
    }

    /// Create a 200 OK `{"message": ...}` response
    pub fn ok_message(message: &str) -> Self {
        Self::message(200, message)
    }

    /// Create a 405 response advertising the methods the path accepts
    pub fn method_not_allowed(allowed: &[&str]) -> Self {
        let mut response = Self::message(405, "Method not allowed.");
        response.set_header("Allow", &allowed.join(", "));
        response
    }

    /// Set a header, replacing any existing header of the same name
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            existing.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    /// Get a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set Content-Type header
    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header("Content-Type", content_type);
    }

    /// Set Content-Length header based on body size
    pub fn set_content_length(&mut self) {
        let length = self.body.len().to_string();
        self.set_header("Content-Length", &length);
    }

    /// Set Cache-Control header
    pub fn set_cache_control(&mut self, cache_control: &str) {
        self.set_header("Cache-Control", cache_control);
    }

    /// Add security headers. API responses are never cached.
    pub fn add_security_headers(&mut self) {
        self.set_header("X-Content-Type-Options", "nosniff");
        self.set_header("X-Frame-Options", "DENY");
        self.set_cache_control("no-store");
    }

    /// Encode the response for a specific HTTP version
    ///
    /// # Arguments
    /// * `version` - HTTP version to encode for
    /// * `keep_alive` - Whether to keep the connection alive
    ///
    /// # Returns
    /// * `Vec<u8>` - Encoded response bytes
    pub fn encode(&self, version: &HttpVersion, keep_alive: bool) -> Vec<u8> {
        let mut response = Vec::with_capacity(self.body.len() + 256);

        let status_line = format!("{} {} {}\r\n",
            version.status_line_prefix(),
            self.status_code,
            self.status_text
        );
        response.extend_from_slice(status_line.as_bytes());

        for (name, value) in &self.headers {
            let header_line = format!("{}: {}\r\n", name, value);
            response.extend_from_slice(header_line.as_bytes());
        }

        if self.header("Content-Length").is_none() {
            let header_line = format!("Content-Length: {}\r\n", self.body.len());
            response.extend_from_slice(header_line.as_bytes());
        }

        match version {
            HttpVersion::Http11 => {
                if !keep_alive {
                    response.extend_from_slice(b"Connection: close\r\n");
                }
            },
            HttpVersion::Http10 => {
                if keep_alive {
                    response.extend_from_slice(b"Connection: Keep-Alive\r\n");
                }
            },
        }

        response.extend_from_slice(b"\r\n");
        response.extend_from_slice(&self.body);

        response
    }
}
