//! Enhanced error reporting module
//! Provides detailed error information for file operations and network operations,
//! and the client-facing error every handler failure is reduced to.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;

use super::http_response::HttpResponse;

/// Enhanced error type that provides context about what operation failed
#[derive(Debug)]
pub struct EnhancedError {
    pub operation: String,
    pub path: Option<String>,
    pub original_error: Box<dyn Error + Send + Sync>,
}

impl EnhancedError {
    /// The io::ErrorKind of the wrapped error, if it is an io::Error
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        self.original_error
            .downcast_ref::<io::Error>()
            .map(|e| e.kind())
    }
}

impl fmt::Display for EnhancedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{} failed for '{}': {}", self.operation, path, self.original_error)
        } else {
            write!(f, "{} failed: {}", self.operation, self.original_error)
        }
    }
}

impl Error for EnhancedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.original_error.as_ref())
    }
}

/// Helper function to create enhanced error for file operations
pub fn file_operation_error<P: AsRef<Path>>(
    operation: &str,
    path: P,
    error: io::Error,
) -> EnhancedError {
    EnhancedError {
        operation: operation.to_string(),
        path: Some(path.as_ref().to_string_lossy().to_string()),
        original_error: Box::new(error),
    }
}

/// Helper function to create enhanced error for network operations
pub fn network_operation_error(
    operation: &str,
    address: &str,
    error: Box<dyn Error + Send + Sync>,
) -> EnhancedError {
    EnhancedError {
        operation: operation.to_string(),
        path: Some(address.to_string()),
        original_error: error,
    }
}

/// Helper function to create enhanced error for general operations
pub fn operation_error(
    operation: &str,
    error: Box<dyn Error + Send + Sync>,
) -> EnhancedError {
    EnhancedError {
        operation: operation.to_string(),
        path: None,
        original_error: error,
    }
}

/// A failure as the client sees it: a status code and a one-line message.
///
/// The cause, when there is one, stays on the server side and is logged.
#[derive(Debug)]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    /// A 500 whose cause is logged here and hidden from the client
    pub fn internal(message: impl Into<String>, cause: &dyn Error) -> Self {
        let message = message.into();
        log::error!("{}: {}", message, cause);
        Self::new(500, message)
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::message(self.status_code, &self.message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl Error for ApiError {}

/// Enhanced file operations with detailed error reporting
pub mod file_ops {
    use super::*;
    use std::fs;
    use std::path::Path;

    /// Enhanced version of std::fs::create_dir_all with detailed error reporting
    pub fn create_dir_all<P: AsRef<Path>>(path: P) -> Result<(), EnhancedError> {
        fs::create_dir_all(&path)
            .map_err(|e| file_operation_error("create_dir_all", &path, e))
    }

    /// Enhanced version of std::fs::write with detailed error reporting
    pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<(), EnhancedError> {
        fs::write(&path, contents)
            .map_err(|e| file_operation_error("write", &path, e))
    }

    /// Enhanced version of std::fs::read_dir with detailed error reporting
    pub fn read_dir<P: AsRef<Path>>(path: P) -> Result<fs::ReadDir, EnhancedError> {
        fs::read_dir(&path)
            .map_err(|e| file_operation_error("read_dir", &path, e))
    }

    /// Enhanced version of std::fs::rename with detailed error reporting
    pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<(), EnhancedError> {
        fs::rename(&from, &to)
            .map_err(|e| file_operation_error("rename", &from, e))
    }

    /// Enhanced version of std::fs::remove_file with detailed error reporting
    pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<(), EnhancedError> {
        fs::remove_file(&path)
            .map_err(|e| file_operation_error("remove_file", &path, e))
    }
}

/// Enhanced network operations with detailed error reporting
pub mod network_ops {
    use super::*;
    use tokio::net::TcpListener;

    /// Enhanced version of TcpListener::bind with detailed error reporting
    pub async fn bind_tcp_listener(addr: &str) -> Result<TcpListener, EnhancedError> {
        TcpListener::bind(addr).await
            .map_err(|e| network_operation_error("bind_tcp_listener", addr, Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_error_names_operation_and_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");

        let err = file_ops::rename(&missing, dir.path().join("elsewhere.txt")).unwrap_err();
        let text = err.to_string();

        assert!(text.starts_with("rename failed for '"));
        assert!(text.contains("missing.txt"));
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_operation_error_without_path() {
        let err = operation_error("spawn_blocking", "worker panicked".into());
        assert_eq!(err.to_string(), "spawn_blocking failed: worker panicked");
        assert_eq!(err.io_kind(), None);
    }

    #[test]
    fn test_api_error_becomes_json_message() {
        let response = ApiError::bad_request("Invalid branch name.").into_response();
        assert_eq!(response.status_code, 400);

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "Invalid branch name." }));
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let cause = io::Error::new(io::ErrorKind::PermissionDenied, "secret path /srv/x");
        let response = ApiError::internal("Error retrieving files.", &cause).into_response();
        assert_eq!(response.status_code, 500);
        assert!(!String::from_utf8_lossy(&response.body).contains("secret"));
    }
}
