//! Statistics generation from the genealogy database
//!
//! This module provides functionality for extracting and displaying
//! store statistics from the storage layer.

use crate::storage::{RelationType, SessionRecord, Storage};
use crate::LineageError;
use std::collections::HashMap;

/// Number of sessions shown by `print_statistics`
const RECENT_SESSIONS: usize = 5;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of stored persons
    pub total_persons: u64,

    /// Count of edges by relationship type
    pub relationships_by_type: HashMap<RelationType, u64>,

    /// Discovered identifiers that have not been fetched yet
    pub pending_discovered: u64,

    /// Most recent sessions, newest first
    pub recent_sessions: Vec<SessionRecord>,
}

impl CrawlStatistics {
    /// Total number of stored edges
    pub fn total_relationships(&self) -> u64 {
        self.relationships_by_type.values().sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(LineageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, LineageError> {
    Ok(CrawlStatistics {
        total_persons: storage.count_persons()?,
        relationships_by_type: storage.count_relationships_by_type()?,
        pending_discovered: storage.count_unfetched_discovered()?,
        recent_sessions: storage.list_recent_sessions(RECENT_SESSIONS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Genealogy Statistics ===\n");

    println!("Overview:");
    println!("  Persons stored: {}", stats.total_persons);
    println!("  Relationships: {}", stats.total_relationships());
    println!("  Discovered, not yet fetched: {}", stats.pending_discovered);
    println!();

    println!("Relationships by Type:");
    for kind in RelationType::all() {
        let count = stats.relationships_by_type.get(&kind).copied().unwrap_or(0);
        println!("  {}: {}", kind, count);
    }
    println!();

    if !stats.recent_sessions.is_empty() {
        println!("Recent Sessions:");
        for session in &stats.recent_sessions {
            println!(
                "  #{} {} [{}] started {}, {} fetched{}",
                session.id,
                session.mode.to_db_string(),
                session.status.to_db_string(),
                session.started_at,
                session.fetched_count,
                session
                    .seed_url
                    .as_deref()
                    .map(|seed| format!(", seed {}", seed))
                    .unwrap_or_default()
            );
        }
        println!();
    }

    // Share of known identifiers that have been fetched
    let known = stats.total_persons + stats.pending_discovered;
    let coverage = if known > 0 {
        (stats.total_persons as f64 / known as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Coverage: {:.1}% ({} / {} known identifiers fetched)",
        coverage, stats.total_persons, known
    );
}
