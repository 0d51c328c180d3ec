//! Database schema definitions
//!
//! Checkpoints are insert-only: a resume reads a row, and the next pause
//! writes a new one.

/// SQL schema for the checkpoint database
pub const SCHEMA_SQL: &str = r#"
-- One row per saved crawl state
CREATE TABLE IF NOT EXISTS checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL,
    created_at TEXT NOT NULL,
    page_count INTEGER NOT NULL,
    config_hash TEXT,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_domain ON checkpoints(domain);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
