//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    DiscoveredUrl, PersonRecord, RelationType, Relationship, SessionMode, SessionRecord,
    SessionStatus, UnresolvedEdge,
};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes are idempotent: re-upserting a person overwrites its fields,
/// re-adding an edge or a discovered URL is a no-op. Callers share one
/// backend across workers behind a lock, so each call must be complete on
/// its own.
pub trait Storage {
    // ===== Persons =====

    /// Inserts or overwrites a person record (last write wins)
    fn upsert_person(&mut self, person: &PersonRecord) -> StorageResult<()>;

    /// Gets a person by identifier
    fn get_person(&self, id: &str) -> StorageResult<Option<PersonRecord>>;

    /// Lists every stored identifier
    fn list_all_person_ids(&self) -> StorageResult<Vec<String>>;

    /// Lists every stored person in insertion order
    fn list_all_persons(&self) -> StorageResult<Vec<PersonRecord>>;

    // ===== Relationships =====

    /// Adds a typed edge; re-adding the same triple is a no-op
    fn add_edge(&mut self, person_id: &str, related_id: &str, kind: RelationType)
        -> StorageResult<()>;

    /// Gets all edges asserted by a person
    fn get_edges(&self, person_id: &str) -> StorageResult<Vec<Relationship>>;

    /// Lists every edge in discovery order
    fn list_all_relationships(&self) -> StorageResult<Vec<Relationship>>;

    /// Finds edges whose target has no record and no discovered-URL hint
    fn find_unresolved_edges(&self) -> StorageResult<Vec<UnresolvedEdge>>;

    // ===== Discovered URLs =====

    /// Records a URL hint for an identifier; the first hint wins
    fn record_discovered(&mut self, id: &str, url: &str) -> StorageResult<()>;

    /// Gets the URL hint recorded for an identifier
    fn get_discovered_url(&self, id: &str) -> StorageResult<Option<String>>;

    /// Lists hints whose identifier has no stored record, in discovery order
    fn list_unfetched_discovered(&self) -> StorageResult<Vec<DiscoveredUrl>>;

    // ===== Sessions =====

    /// Opens a new session in the `running` state
    fn create_session(
        &mut self,
        mode: SessionMode,
        seed_url: Option<&str>,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Closes a session with its final status and success count
    fn finish_session(
        &mut self,
        session_id: i64,
        status: SessionStatus,
        fetched_count: u64,
    ) -> StorageResult<()>;

    /// Gets a session by ID
    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord>;

    /// Lists the most recent sessions, newest first
    fn list_recent_sessions(&self, limit: usize) -> StorageResult<Vec<SessionRecord>>;

    // ===== Statistics =====

    /// Counts stored persons
    fn count_persons(&self) -> StorageResult<u64>;

    /// Counts edges grouped by type
    fn count_relationships_by_type(&self) -> StorageResult<HashMap<RelationType, u64>>;

    /// Counts hints whose identifier has no stored record
    fn count_unfetched_discovered(&self) -> StorageResult<u64>;
}
