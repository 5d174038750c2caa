//! gadaa-portal: branch file upload portal for Gadaa Bank
//!
//! A small HTTP/1.x server with a mock login, staged multipart uploads into
//! per-branch directories, and per-branch file listings.

pub mod modules;

pub use modules::config::{CliAction, PortalConfig};
pub use modules::portal::Portal;
pub use modules::server::PortalServer;
pub use modules::upload_store::UploadStore;
