//! gadaa-portal binary: parse the command line, start logging, serve.

use std::process::ExitCode;

use gadaa_portal::modules::config::USAGE;
use gadaa_portal::modules::file_logger::init_logging;
use gadaa_portal::{CliAction, PortalConfig, PortalServer};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match PortalConfig::from_env() {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            print!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("gadaa-portal: {}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(config.log_level, config.log_file.as_deref()) {
        eprintln!("gadaa-portal: {}", e);
        return ExitCode::FAILURE;
    }

    log::info!("Using uploads directory {}", config.uploads_root.display());

    let server = match PortalServer::from_config(&config) {
        Ok(server) => server,
        Err(e) => {
            log::error!("Failed to prepare uploads directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.bind_and_run(&config).await {
        log::error!("{}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
