//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Person records (upsert, last write wins)
//! - Typed relationship edges (set semantics)
//! - Discovered-but-unfetched URL hints, the durable form of the frontier
//! - Crawl session tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::LineageError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, LineageError> {
    SqliteStorage::new(path)
}

/// A normalized biographical record for one person
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRecord {
    /// Site-assigned opaque identifier
    pub id: String,
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    /// Birth date as written on the site
    pub birth_date: Option<String>,
    /// Birth date converted to the civil calendar
    pub birth_date_civil: Option<String>,
    pub birth_place: Option<String>,
    pub death_date: Option<String>,
    pub death_date_civil: Option<String>,
    pub death_place: Option<String>,
    /// `M` or `F` when known
    pub gender: Option<String>,
    /// Page this record was fetched from
    pub url: String,
}

/// Type of a relationship edge, as seen from `person_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationType {
    Father,
    Mother,
    Spouse,
    Child,
}

impl RelationType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Father => "father",
            Self::Mother => "mother",
            Self::Spouse => "spouse",
            Self::Child => "child",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "father" => Some(Self::Father),
            "mother" => Some(Self::Mother),
            "spouse" => Some(Self::Spouse),
            "child" => Some(Self::Child),
            _ => None,
        }
    }

    /// Returns true for edges pointing from a child to one of its parents
    pub fn is_parent(&self) -> bool {
        matches!(self, Self::Father | Self::Mother)
    }

    pub fn all() -> [Self; 4] {
        [Self::Father, Self::Mother, Self::Spouse, Self::Child]
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A directed, typed edge; the triple is the identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub person_id: String,
    pub related_id: String,
    pub kind: RelationType,
}

/// A candidate identifier and a URL that should fetch it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredUrl {
    pub id: String,
    pub url: String,
}

/// An edge whose target has neither a record nor a discovered-URL hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedEdge {
    pub person_id: String,
    pub related_id: String,
    pub kind: RelationType,
    /// URL of the person asserting the edge, if that person is stored
    pub source_url: Option<String>,
}

/// Represents a crawl session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub mode: SessionMode,
    pub seed_url: Option<String>,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: SessionStatus,
    pub fetched_count: u64,
}

/// Entry point that opened a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Scrape,
    Crawl,
    Retry,
}

impl SessionMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Crawl => "crawl",
            Self::Retry => "retry",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "scrape" => Some(Self::Scrape),
            "crawl" => Some(Self::Crawl),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

/// Status of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
