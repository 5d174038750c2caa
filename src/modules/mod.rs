//! Modules for the gadaa-portal server
//!
//! This module contains the HTTP plumbing, the mock credential check, the
//! branch allow-list, and upload storage.

pub mod auth;
pub mod branches;
pub mod config;
pub mod connection_policy;
pub mod enhanced_error;
pub mod file_logger;
pub mod form;
pub mod http_request;
pub mod http_response;
pub mod http_version;
pub mod multipart;
pub mod portal;
pub mod server;
pub mod upload_store;
