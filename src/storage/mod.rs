//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite table:
//! - reports(id, event_type, description, latitude, longitude, observed_at, created_at)
//!
//! `StoreConfig` is built once at startup. `Database` hands out a fresh
//! `ReportStore` session per operation and always releases it afterwards.

pub mod schema;
pub mod sqlite;

pub use sqlite::ReportStore;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Error, Result};

/// SQLite journal mode applied to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Write-ahead log; readers don't block the writer
    #[default]
    Wal,
    /// Rollback journal
    Delete,
}

impl JournalMode {
    /// Returns the `SQLite` pragma value.
    pub fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// Connection parameters for the report store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("skywatch.db"),
            busy_timeout_ms: 5_000,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Session factory over a file-backed report store
#[derive(Debug, Clone)]
pub struct Database {
    config: Arc<StoreConfig>,
}

impl Database {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[cfg(test)]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the store directory and schema if they don't exist yet
    pub fn initialize(&self) -> Result<()> {
        crate::config::ensure_db_dir(&self.config.path)?;
        let journal_mode = self.with_session(|store| {
            store.initialize_schema()?;
            store.journal_mode()
        })?;
        tracing::info!(
            journal_mode = %journal_mode,
            "Report store ready at {}",
            self.config.path.display()
        );
        Ok(())
    }

    /// Open a new, independent session
    pub fn open_session(&self) -> Result<ReportStore> {
        tracing::debug!("Opening store session on {}", self.config.path.display());
        ReportStore::open(&self.config)
    }

    /// Run `op` on a fresh session and release the session on every exit path.
    ///
    /// An error from `op` takes precedence over an error from closing.
    pub fn with_session<T>(&self, op: impl FnOnce(&mut ReportStore) -> Result<T>) -> Result<T> {
        let mut session = self.open_session()?;
        let result = op(&mut session);

        match (session.close(), result) {
            (Ok(()), result) => result,
            (Err(close_err), Ok(_)) => Err(close_err),
            (Err(close_err), Err(op_err)) => {
                tracing::warn!(error = %close_err, "Failed to close store session");
                Err(op_err)
            }
        }
    }

    /// `with_session` on the blocking thread pool, for use from async handlers
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ReportStore) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_session(op))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}
