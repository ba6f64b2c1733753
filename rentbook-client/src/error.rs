//! Error types for the rentbook binary.

use rentbook_core::RentbookError;

use crate::config::ConfigError;
use crate::http::HttpStoreError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Usage: {0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Http(#[from] HttpStoreError),
    #[error(transparent)]
    Rentbook(#[from] RentbookError),
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}
