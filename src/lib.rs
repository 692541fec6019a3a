//! Lineage crawler: a polite genealogy graph harvester
//!
//! This crate walks a single paginated genealogy site person by person,
//! stores every biographical record and parent/child/spouse edge it finds,
//! and later rebuilds those edges into family units for GEDCOM export.

pub mod calendar;
pub mod config;
pub mod crawler;
pub mod family;
pub mod names;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum LineageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch seed {url}: {reason}")]
    SeedFetch { url: String, reason: String },

    #[error("Seed URL carries no person identifier: {0}")]
    InvalidSeed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shared state lock was poisoned")]
    LockPoisoned,

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, LineageError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, retry_pending, scrape_one};
pub use family::{build_families, Family, FamilyGraph};
pub use state::{AttemptOutcome, EntryState, FailureKind};
pub use storage::{PersonRecord, RelationType, Relationship};
