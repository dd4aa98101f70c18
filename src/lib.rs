//! # SkyWatch - Sky Event Sighting Reports
//!
//! A small HTTP service where observers submit sightings of sky events
//! (meteors, satellites, flashes, ...) and browse the most recent ones.
//!
//! SkyWatch provides:
//! - A normalized `Report` record and inbound payload validation
//! - SQLite-backed storage with one scoped session per request
//! - An axum HTTP API (`/health`, `/reports`)
//! - TOML configuration with an environment override for the store location

pub mod config;
pub mod report;
pub mod server;
pub mod storage;

// Re-exports for convenient access
pub use report::{CreateReport, NewReport, Report};
pub use storage::{Database, ReportStore, StoreConfig};

/// Result type alias for SkyWatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SkyWatch operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage task failed: {0}")]
    Task(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Timestamp(_))
    }
}
