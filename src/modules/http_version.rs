//! HTTP Version Support
//!
//! The portal speaks HTTP/1.0 and HTTP/1.1. Anything else on the request
//! line is rejected by the request reader with 505.

/// HTTP version enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    /// HTTP/1.0 - Closes after each response unless Keep-Alive is requested
    Http10,
    /// HTTP/1.1 - Persistent connections by default
    Http11,
}

impl HttpVersion {
    /// Parse the protocol token of a request line (e.g. `HTTP/1.1`)
    ///
    /// # Returns
    /// * `Option<HttpVersion>` - `None` for versions the portal does not serve
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "HTTP/1.1" => Some(HttpVersion::Http11),
            "HTTP/1.0" => Some(HttpVersion::Http10),
            _ => None,
        }
    }

    /// Get the status line prefix for this HTTP version
    pub fn status_line_prefix(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }

    /// Check if this version supports persistent connections by default
    pub fn supports_persistent_connections(&self) -> bool {
        matches!(self, HttpVersion::Http11)
    }

    /// Whether a client of this version may send `Expect: 100-continue`
    pub fn supports_continue(&self) -> bool {
        matches!(self, HttpVersion::Http11)
    }
}

impl std::fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.status_line_prefix())
    }
}
