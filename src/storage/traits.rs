//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::state::CrawlState;
use crate::storage::{CheckpointHandle, CheckpointRecord, CheckpointSummary};
use crate::CrawlError;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backend implementations
///
/// Records are immutable once written. Resuming reads a record; the next
/// pause writes a new one.
pub trait CheckpointStore {
    /// Writes a snapshot and returns its handle
    fn write(
        &mut self,
        record: &CheckpointRecord,
        config_hash: Option<&str>,
    ) -> StorageResult<CheckpointHandle>;

    /// Snapshots `state`, logging instead of failing
    ///
    /// Returns `None` when the record could not be written; the crawl that
    /// asked for it is then not resumable.
    fn save(&mut self, state: &CrawlState, config_hash: Option<&str>) -> Option<CheckpointHandle> {
        match self.write(&CheckpointRecord::from(state), config_hash) {
            Ok(handle) => {
                info!(
                    id = handle.id,
                    domain = %state.domain,
                    pages = state.page_count,
                    "Checkpoint saved"
                );
                Some(handle)
            }
            Err(e) => {
                let err = CrawlError::CheckpointWrite(e.to_string());
                error!(domain = %state.domain, error = %err, "Crawl state not saved");
                None
            }
        }
    }

    /// Lists readable checkpoints, newest first
    ///
    /// Records that cannot be parsed are logged and left out.
    fn list(&self) -> Result<Vec<CheckpointSummary>, CrawlError>;

    /// Loads the state stored under `handle`
    ///
    /// # Errors
    ///
    /// * `CrawlError::CheckpointNotFound` - No record with that id
    /// * `CrawlError::CorruptCheckpoint` - The record does not parse
    /// * `CrawlError::CheckpointRead` - The backend failed
    fn load(&self, handle: &CheckpointHandle) -> Result<CrawlState, CrawlError>;
}
