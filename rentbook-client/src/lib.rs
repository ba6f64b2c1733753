//! rentbook Client
//!
//! The pieces the `rentbook` binary is made of: TOML configuration, the
//! HTTP bill store that talks to the rentbook API, tracing setup and
//! argument parsing.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod telemetry;

pub use cli::CliArgs;
pub use config::{AuthConfig, ClientConfig, ConfigError};
pub use error::CliError;
pub use http::{HttpBillStore, HttpStoreError};
pub use telemetry::{init_tracing, TelemetryConfig};
