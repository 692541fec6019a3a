//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the crawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Biographical records, one per site identifier
CREATE TABLE IF NOT EXISTS persons (
    id TEXT PRIMARY KEY,
    name TEXT,
    prefix TEXT,
    first_name TEXT,
    last_name TEXT,
    suffix TEXT,
    birth_date TEXT,
    birth_date_civil TEXT,
    birth_place TEXT,
    death_date TEXT,
    death_date_civil TEXT,
    death_place TEXT,
    gender TEXT,
    url TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

-- Typed edges; the triple is the identity
CREATE TABLE IF NOT EXISTS relationships (
    person_id TEXT NOT NULL,
    related_id TEXT NOT NULL,
    type TEXT NOT NULL,
    PRIMARY KEY (person_id, related_id, type)
);

CREATE INDEX IF NOT EXISTS idx_relationships_related ON relationships(related_id);

-- URL hints for identifiers seen on some page, fetched or not
CREATE TABLE IF NOT EXISTS discovered_urls (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    discovered_at TEXT NOT NULL
);

-- Crawl sessions
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    seed_url TEXT,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    fetched_count INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
