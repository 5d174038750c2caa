// file_logger.rs - Console and persistent file logging
// Backs the `log` facade: every record goes to stderr and, when configured,
// is appended to a log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

use super::enhanced_error::{file_operation_error, operation_error, EnhancedError};

/// File logger that writes log lines to a file
pub struct FileLogger {
    file: Mutex<File>,
    log_path: String,
}

impl FileLogger {
    /// Create a new file logger, creating the parent directory if needed
    pub fn new(log_path: &Path) -> Result<Self, EnhancedError> {
        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| file_operation_error("create_dir_all", parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| file_operation_error("open", log_path, e))?;

        Ok(FileLogger {
            file: Mutex::new(file),
            log_path: log_path.to_string_lossy().to_string(),
        })
    }

    /// Write one formatted line to the file
    pub fn write_line(&self, line: &str) -> std::io::Result<()> {
        // A poisoned lock still holds a usable file handle.
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()
    }

    /// Get the log file path
    pub fn log_path(&self) -> &str {
        &self.log_path
    }
}

/// Format a record as `<unix-ts> <LEVEL> <target>: <message>`
pub fn format_record(timestamp: u64, record: &Record) -> String {
    format!("{} {} {}: {}", timestamp, record.level(), record.target(), record.args())
}

/// `log` backend used by the portal binary
pub struct PortalLogger {
    level: LevelFilter,
    file: Option<FileLogger>,
}

impl PortalLogger {
    pub fn new(level: LevelFilter, file: Option<FileLogger>) -> Self {
        Self { level, file }
    }
}

impl Log for PortalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let line = format_record(timestamp, record);

        eprintln!("{}", line);

        if let Some(file) = &self.file {
            if let Err(e) = file.write_line(&line) {
                eprintln!("Failed to write to log file {}: {}", file.log_path(), e);
            }
        }
    }

    fn flush(&self) {}
}

/// Install the portal logger as the global `log` backend
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), EnhancedError> {
    let file = log_file.map(FileLogger::new).transpose()?;

    log::set_boxed_logger(Box::new(PortalLogger::new(level, file)))
        .map_err(|e| operation_error("init_logging", Box::new(e)))?;
    log::set_max_level(level);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use tempfile::tempdir;

    #[test]
    fn test_file_logger_creates_parent_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("portal.log");

        let logger = FileLogger::new(&path).unwrap();
        logger.write_line("first").unwrap();
        logger.write_line("second").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_format_record() {
        let line = format_record(
            1_700_000_000,
            &Record::builder()
                .args(format_args!("GET / 200"))
                .level(Level::Info)
                .target("gadaa_portal::server")
                .build(),
        );
        assert_eq!(line, "1700000000 INFO gadaa_portal::server: GET / 200");
    }

    #[test]
    fn test_portal_logger_respects_level_and_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portal.log");
        let logger = PortalLogger::new(LevelFilter::Info, Some(FileLogger::new(&path).unwrap()));

        logger.log(&Record::builder().args(format_args!("hidden")).level(Level::Debug).target("t").build());
        logger.log(&Record::builder().args(format_args!("shown")).level(Level::Warn).target("t").build());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("hidden"));
        assert!(contents.trim_end().ends_with("WARN t: shown"));
    }
}
