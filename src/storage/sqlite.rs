//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    DiscoveredUrl, PersonRecord, RelationType, Relationship, SessionMode, SessionRecord,
    SessionStatus, UnresolvedEdge,
};
use crate::LineageError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const PERSON_COLUMNS: &str = "id, name, prefix, first_name, last_name, suffix,
     birth_date, birth_date_civil, birth_place,
     death_date, death_date_civil, death_place, gender, url";

const SESSION_COLUMNS: &str =
    "id, mode, seed_url, config_hash, started_at, finished_at, status, fetched_count";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, LineageError> {
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
    pub fn open_in_memory() -> Result<Self, LineageError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<PersonRecord> {
    Ok(PersonRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        prefix: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        suffix: row.get(5)?,
        birth_date: row.get(6)?,
        birth_date_civil: row.get(7)?,
        birth_place: row.get(8)?,
        death_date: row.get(9)?,
        death_date_civil: row.get(10)?,
        death_place: row.get(11)?,
        gender: row.get(12)?,
        url: row.get(13)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        mode: SessionMode::from_db_string(&row.get::<_, String>(1)?).unwrap_or(SessionMode::Crawl),
        seed_url: row.get(2)?,
        config_hash: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        status: SessionStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(SessionStatus::Running),
        fetched_count: row.get::<_, i64>(7)? as u64,
    })
}

/// Maps a `(person_id, related_id, type)` row, dropping unknown types
fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<Option<Relationship>> {
    let person_id: String = row.get(0)?;
    let related_id: String = row.get(1)?;
    let kind: String = row.get(2)?;
    Ok(RelationType::from_db_string(&kind).map(|kind| Relationship {
        person_id,
        related_id,
        kind,
    }))
}

impl Storage for SqliteStorage {
    // ===== Persons =====

    fn upsert_person(&mut self, person: &PersonRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO persons (id, name, prefix, first_name, last_name, suffix,
                 birth_date, birth_date_civil, birth_place,
                 death_date, death_date_civil, death_place, gender, url, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 prefix = excluded.prefix,
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 suffix = excluded.suffix,
                 birth_date = excluded.birth_date,
                 birth_date_civil = excluded.birth_date_civil,
                 birth_place = excluded.birth_place,
                 death_date = excluded.death_date,
                 death_date_civil = excluded.death_date_civil,
                 death_place = excluded.death_place,
                 gender = excluded.gender,
                 url = excluded.url,
                 fetched_at = excluded.fetched_at",
            params![
                person.id,
                person.name,
                person.prefix,
                person.first_name,
                person.last_name,
                person.suffix,
                person.birth_date,
                person.birth_date_civil,
                person.birth_place,
                person.death_date,
                person.death_date_civil,
                person.death_place,
                person.gender,
                person.url,
                now
            ],
        )?;
        Ok(())
    }

    fn get_person(&self, id: &str) -> StorageResult<Option<PersonRecord>> {
        let sql = format!("SELECT {} FROM persons WHERE id = ?1", PERSON_COLUMNS);
        let person = self
            .conn
            .query_row(&sql, params![id], person_from_row)
            .optional()?;
        Ok(person)
    }

    fn list_all_person_ids(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM persons ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn list_all_persons(&self) -> StorageResult<Vec<PersonRecord>> {
        let sql = format!("SELECT {} FROM persons ORDER BY rowid", PERSON_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let persons = stmt
            .query_map([], person_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(persons)
    }

    // ===== Relationships =====

    fn add_edge(
        &mut self,
        person_id: &str,
        related_id: &str,
        kind: RelationType,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO relationships (person_id, related_id, type) VALUES (?1, ?2, ?3)",
            params![person_id, related_id, kind.to_db_string()],
        )?;
        Ok(())
    }

    fn get_edges(&self, person_id: &str) -> StorageResult<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(
            "SELECT person_id, related_id, type FROM relationships
             WHERE person_id = ?1 ORDER BY rowid",
        )?;
        let edges = stmt
            .query_map(params![person_id], relationship_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges.into_iter().flatten().collect())
    }

    fn list_all_relationships(&self) -> StorageResult<Vec<Relationship>> {
        let mut stmt = self
            .conn
            .prepare("SELECT person_id, related_id, type FROM relationships ORDER BY rowid")?;
        let edges = stmt
            .query_map([], relationship_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges.into_iter().flatten().collect())
    }

    fn find_unresolved_edges(&self) -> StorageResult<Vec<UnresolvedEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.person_id, r.related_id, r.type, p.url
             FROM relationships r
             LEFT JOIN persons p ON p.id = r.person_id
             WHERE NOT EXISTS (SELECT 1 FROM persons x WHERE x.id = r.related_id)
               AND NOT EXISTS (SELECT 1 FROM discovered_urls d WHERE d.id = r.related_id)
             ORDER BY r.rowid",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let person_id: String = row.get(0)?;
                let related_id: String = row.get(1)?;
                let kind: String = row.get(2)?;
                let source_url: Option<String> = row.get(3)?;
                Ok(RelationType::from_db_string(&kind).map(|kind| UnresolvedEdge {
                    person_id,
                    related_id,
                    kind,
                    source_url,
                }))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().flatten().collect())
    }

    // ===== Discovered URLs =====

    fn record_discovered(&mut self, id: &str, url: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO discovered_urls (id, url, discovered_at) VALUES (?1, ?2, ?3)",
            params![id, url, now],
        )?;
        Ok(())
    }

    fn get_discovered_url(&self, id: &str) -> StorageResult<Option<String>> {
        let url = self
            .conn
            .query_row(
                "SELECT url FROM discovered_urls WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(url)
    }

    fn list_unfetched_discovered(&self) -> StorageResult<Vec<DiscoveredUrl>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.url FROM discovered_urls d
             WHERE NOT EXISTS (SELECT 1 FROM persons p WHERE p.id = d.id)
             ORDER BY d.rowid",
        )?;
        let hints = stmt
            .query_map([], |row| {
                Ok(DiscoveredUrl {
                    id: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hints)
    }

    // ===== Sessions =====

    fn create_session(
        &mut self,
        mode: SessionMode,
        seed_url: Option<&str>,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sessions (mode, seed_url, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                mode.to_db_string(),
                seed_url,
                config_hash,
                now,
                SessionStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_session(
        &mut self,
        session_id: i64,
        status: SessionStatus,
        fetched_count: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sessions SET status = ?1, finished_at = ?2, fetched_count = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, fetched_count as i64, session_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(())
    }

    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord> {
        let sql = format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS);
        self.conn
            .query_row(&sql, params![session_id], session_from_row)
            .optional()?
            .ok_or(StorageError::SessionNotFound(session_id))
    }

    fn list_recent_sessions(&self, limit: usize) -> StorageResult<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT {} FROM sessions ORDER BY id DESC LIMIT ?1",
            SESSION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(params![limit as i64], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    // ===== Statistics =====

    fn count_persons(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM persons", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_relationships_by_type(&self) -> StorageResult<HashMap<RelationType, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type, COUNT(*) FROM relationships GROUP BY type")?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (kind, count) = row?;
            if let Some(kind) = RelationType::from_db_string(&kind) {
                counts.insert(kind, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_unfetched_discovered(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovered_urls d
             WHERE NOT EXISTS (SELECT 1 FROM persons p WHERE p.id = d.id)",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
