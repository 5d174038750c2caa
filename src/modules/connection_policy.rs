//! Connection Policy Handler
//!
//! This module handles Keep-Alive decisions and the size limits applied to
//! every request read from a connection.

use std::time::Duration;

use super::http_version::HttpVersion;

/// Connection policy for determining Keep-Alive behavior
#[derive(Debug, Clone)]
pub struct ConnectionPolicy {
    /// Maximum number of requests per connection
    pub max_requests: usize,
    /// How long an idle connection waits for the next request
    pub idle_timeout: Duration,
    /// Largest request head (request line plus headers) accepted
    pub max_head_bytes: usize,
    /// Largest request body accepted
    pub max_body_bytes: u64,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            max_requests: 100,
            idle_timeout: Duration::from_secs(5),
            max_head_bytes: 16 * 1024,
            max_body_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ConnectionPolicy {
    /// Determine if connection should be kept alive
    ///
    /// # Arguments
    /// * `version` - HTTP version of the request
    /// * `request_connection_header` - Connection header from request (if any)
    /// * `request_count` - Number of requests already handled on this connection
    pub fn should_keep_alive(
        &self,
        version: &HttpVersion,
        request_connection_header: Option<&str>,
        request_count: usize,
    ) -> bool {
        if request_count >= self.max_requests {
            return false;
        }

        let tokens = request_connection_header
            .map(|header| header.to_ascii_lowercase())
            .unwrap_or_default();

        if version.supports_persistent_connections() {
            // Keep alive by default, unless client requests close
            !tokens.contains("close")
        } else {
            // Keep alive only if client explicitly requests it
            tokens.contains("keep-alive")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_with_max(max_requests: usize) -> ConnectionPolicy {
        ConnectionPolicy { max_requests, ..ConnectionPolicy::default() }
    }

    #[test]
    fn test_http10_keep_alive_only_if_requested() {
        let policy = ConnectionPolicy::default();
        assert!(!policy.should_keep_alive(&HttpVersion::Http10, None, 1));
        assert!(!policy.should_keep_alive(&HttpVersion::Http10, Some("close"), 1));
        assert!(policy.should_keep_alive(&HttpVersion::Http10, Some("Keep-Alive"), 1));
        assert!(policy.should_keep_alive(&HttpVersion::Http10, Some("keep-alive"), 1));
    }

    #[test]
    fn test_http11_keep_alive_by_default() {
        let policy = ConnectionPolicy::default();
        assert!(policy.should_keep_alive(&HttpVersion::Http11, None, 1));
        assert!(policy.should_keep_alive(&HttpVersion::Http11, Some("keep-alive"), 1));
        assert!(!policy.should_keep_alive(&HttpVersion::Http11, Some("close"), 1));
        assert!(!policy.should_keep_alive(&HttpVersion::Http11, Some("Close"), 1));
    }

    #[test]
    fn test_max_requests_limit() {
        let policy = policy_with_max(5);
        assert!(policy.should_keep_alive(&HttpVersion::Http11, None, 4));
        assert!(!policy.should_keep_alive(&HttpVersion::Http11, None, 5));
        assert!(!policy.should_keep_alive(&HttpVersion::Http11, None, 6));
    }
}
