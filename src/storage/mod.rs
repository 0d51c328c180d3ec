//! Storage module for persisting crawl checkpoints
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Writing immutable crawl-state snapshots
//! - Enumerating and loading snapshots for resumption

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCheckpointStore;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::config::CrawlerConfig;
use crate::crawler::Frontier;
use crate::state::CrawlState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens (creating if needed) the checkpoint database at `path`
pub fn open_store(path: &Path) -> Result<SqliteCheckpointStore, StorageError> {
    SqliteCheckpointStore::new(path)
}

/// Identifies one stored checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckpointHandle {
    pub id: i64,
}

/// Listing entry for a stored checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointSummary {
    pub handle: CheckpointHandle,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub page_count: u32,
    pub config_hash: Option<String>,
}

/// The serialized form of a crawl state
///
/// `max_pages` is optional so payloads written without it still load; the
/// configured default is used in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub page_count: u32,
    #[serde(default)]
    pub max_pages: Option<u32>,
    pub visited_urls: Vec<String>,
    pub urls_to_visit: Vec<String>,
    pub found_urls: Vec<String>,
}

impl From<&CrawlState> for CheckpointRecord {
    fn from(state: &CrawlState) -> Self {
        Self {
            domain: state.domain.clone(),
            timestamp: state.timestamp,
            page_count: state.page_count,
            max_pages: Some(state.max_pages),
            visited_urls: state.frontier.visited_urls(),
            urls_to_visit: state.frontier.pending().map(str::to_string).collect(),
            found_urls: state.frontier.discovered().to_vec(),
        }
    }
}

impl From<CheckpointRecord> for CrawlState {
    fn from(record: CheckpointRecord) -> Self {
        Self {
            domain: record.domain,
            frontier: Frontier::restore(
                record.visited_urls,
                record.urls_to_visit,
                record.found_urls,
            ),
            page_count: record.page_count,
            max_pages: record
                .max_pages
                .unwrap_or_else(|| CrawlerConfig::default().max_pages),
            timestamp: record.timestamp,
        }
    }
}
