//! Portal configuration and command line parsing

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use log::LevelFilter;

use super::connection_policy::ConnectionPolicy;

pub const USAGE: &str = "\
gadaa-portal - Gadaa Bank branch file upload portal

USAGE:
    gadaa-portal [OPTIONS]

OPTIONS:
    -b, --bind <ADDR>               Address to listen on [default: 0.0.0.0]
    -p, --port <PORT>               TCP port [default: 5000]
    -u, --uploads-dir <PATH>        Uploads root directory [default: uploads]
        --max-upload-mb <MIB>       Largest accepted request body [default: 100]
        --keep-alive-timeout <SECS> Idle keep-alive timeout [default: 5]
        --log-file <PATH>           Also append log lines to this file
    -v, --verbose                   Log at debug level
    -h, --help                      Print this help
";

/// Everything the portal can be tuned with
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_address: String,
    pub port: u16,
    /// Holds `temp/` and one directory per branch
    pub uploads_root: PathBuf,
    pub connection: ConnectionPolicy,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            uploads_root: PathBuf::from("uploads"),
            connection: ConnectionPolicy::default(),
            log_level: LevelFilter::Info,
            log_file: None,
        }
    }
}

/// What the command line asked for
#[derive(Debug)]
pub enum CliAction {
    Run(PortalConfig),
    Help,
}

impl PortalConfig {
    /// `host:port` string for binding
    pub fn listen_address(&self) -> String {
        if self.bind_address.contains(':') && !self.bind_address.starts_with('[') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }

    /// Parse the process command line
    pub fn from_env() -> Result<CliAction, lexopt::Error> {
        Self::parse(lexopt::Parser::from_env())
    }

    /// Parse arguments; the first item is the program name
    pub fn from_args<I>(args: I) -> Result<CliAction, lexopt::Error>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        Self::parse(lexopt::Parser::from_iter(args))
    }

    fn parse(mut parser: lexopt::Parser) -> Result<CliAction, lexopt::Error> {
        use lexopt::prelude::*;

        let mut config = PortalConfig::default();

        while let Some(arg) = parser.next()? {
            match arg {
                Short('b') | Long("bind") => {
                    config.bind_address = parser.value()?.string()?;
                }
                Short('p') | Long("port") => {
                    config.port = parser.value()?.parse()?;
                }
                Short('u') | Long("uploads-dir") => {
                    config.uploads_root = PathBuf::from(parser.value()?);
                }
                Long("max-upload-mb") => {
                    let mib: u64 = parser.value()?.parse()?;
                    config.connection.max_body_bytes = mib.saturating_mul(1024 * 1024);
                }
                Long("keep-alive-timeout") => {
                    let secs: u64 = parser.value()?.parse()?;
                    config.connection.idle_timeout = Duration::from_secs(secs);
                }
                Long("log-file") => {
                    config.log_file = Some(PathBuf::from(parser.value()?));
                }
                Short('v') | Long("verbose") => {
                    config.log_level = LevelFilter::Debug;
                }
                Short('h') | Long("help") => return Ok(CliAction::Help),
                _ => return Err(arg.unexpected()),
            }
        }

        Ok(CliAction::Run(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> PortalConfig {
        let mut full = vec!["gadaa-portal"];
        full.extend_from_slice(args);
        match PortalConfig::from_args(full).unwrap() {
            CliAction::Run(config) => config,
            CliAction::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = run(&[]);
        assert_eq!(config.listen_address(), "0.0.0.0:5000");
        assert_eq!(config.uploads_root, PathBuf::from("uploads"));
        assert_eq!(config.connection.max_body_bytes, 100 * 1024 * 1024);
        assert_eq!(config.log_level, LevelFilter::Info);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_all_flags() {
        let config = run(&[
            "--bind", "127.0.0.1",
            "-p", "8080",
            "--uploads-dir=/srv/portal",
            "--max-upload-mb", "5",
            "--keep-alive-timeout", "30",
            "--log-file", "/var/log/portal.log",
            "-v",
        ]);
        assert_eq!(config.listen_address(), "127.0.0.1:8080");
        assert_eq!(config.uploads_root, PathBuf::from("/srv/portal"));
        assert_eq!(config.connection.max_body_bytes, 5 * 1024 * 1024);
        assert_eq!(config.connection.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/portal.log")));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_ipv6_bind_is_bracketed() {
        let config = run(&["-b", "::1"]);
        assert_eq!(config.listen_address(), "[::1]:5000");
    }

    #[test]
    fn test_help_and_errors() {
        assert!(matches!(PortalConfig::from_args(["gadaa-portal", "-h"]), Ok(CliAction::Help)));
        assert!(PortalConfig::from_args(["gadaa-portal", "--port", "http"]).is_err());
        assert!(PortalConfig::from_args(["gadaa-portal", "--nope"]).is_err());
        assert!(PortalConfig::from_args(["gadaa-portal", "stray"]).is_err());
    }
}
