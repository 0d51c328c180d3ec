//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CheckpointStore trait.

use crate::state::CrawlState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{CheckpointHandle, CheckpointRecord, CheckpointSummary};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use tracing::error;

/// SQLite checkpoint backend
pub struct SqliteCheckpointStore {
    conn: Connection,
}

impl SqliteCheckpointStore {
    /// Opens or creates the database at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

type CheckpointRow = (i64, String, String, u32, Option<String>, String);

fn summarize(row: CheckpointRow) -> Result<CheckpointSummary, String> {
    let (id, domain, created_at, page_count, config_hash, payload) = row;

    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| format!("bad created_at {:?}: {}", created_at, e))?
        .with_timezone(&Utc);
    serde_json::from_str::<CheckpointRecord>(&payload).map_err(|e| e.to_string())?;

    Ok(CheckpointSummary {
        handle: CheckpointHandle { id },
        domain,
        created_at,
        page_count,
        config_hash,
    })
}

impl CheckpointStore for SqliteCheckpointStore {
    fn write(
        &mut self,
        record: &CheckpointRecord,
        config_hash: Option<&str>,
    ) -> StorageResult<CheckpointHandle> {
        let payload = serde_json::to_string(record)?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO checkpoints (domain, created_at, page_count, config_hash, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.domain, now, record.page_count, config_hash, payload],
        )?;

        Ok(CheckpointHandle {
            id: self.conn.last_insert_rowid(),
        })
    }

    fn list(&self) -> Result<Vec<CheckpointSummary>, CrawlError> {
        let read_err = |e: rusqlite::Error| CrawlError::CheckpointRead(e.to_string());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, domain, created_at, page_count, config_hash, payload
                 FROM checkpoints ORDER BY id DESC",
            )
            .map_err(read_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(read_err)?;

        let mut summaries = Vec::new();
        for row in rows {
            let row: CheckpointRow = match row {
                Ok(row) => row,
                Err(e) => {
                    error!(error = %e, "Skipping unreadable checkpoint row");
                    continue;
                }
            };

            let id = row.0;
            match summarize(row) {
                Ok(summary) => summaries.push(summary),
                Err(message) => {
                    let err = CrawlError::CorruptCheckpoint { id, message };
                    error!(error = %err, "Skipping checkpoint");
                }
            }
        }

        Ok(summaries)
    }

    fn load(&self, handle: &CheckpointHandle) -> Result<CrawlState, CrawlError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM checkpoints WHERE id = ?1",
                params![handle.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CrawlError::CheckpointRead(e.to_string()))?;

        let payload = payload.ok_or(CrawlError::CheckpointNotFound(handle.id))?;

        let record: CheckpointRecord =
            serde_json::from_str(&payload).map_err(|e| CrawlError::CorruptCheckpoint {
                id: handle.id,
                message: e.to_string(),
            })?;

        Ok(CrawlState::from(record))
    }
}
