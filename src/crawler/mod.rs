//! Crawler module for page fetching and graph expansion
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with failure classification
//! - Person-page extraction (record plus relationship edges)
//! - The in-memory frontier with at-most-once claiming
//! - Per-item retry and persistence
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod ingest;
mod parser;

pub use coordinator::{Coordinator, CrawlOptions};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use frontier::Frontier;
pub use ingest::IngestOutcome;
pub use parser::{extract_edges, extract_record, parse_person_page, ExtractedEdge};

use crate::config::Config;
use crate::storage::{PersonRecord, SqliteStorage};
use crate::LineageError;
use std::sync::{Arc, Mutex};

/// Fetches one page and stores its record and edges without following them
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `storage` - The shared store
/// * `url` - Page URL carrying a person identifier
///
/// # Returns
///
/// * `Ok(Some(PersonRecord))` - The stored record
/// * `Ok(None)` - The page carried no identifier
/// * `Err(LineageError)` - The URL is invalid or the page could not be fetched
pub async fn scrape_one(
    config: Config,
    storage: Arc<Mutex<SqliteStorage>>,
    url: &str,
) -> Result<Option<PersonRecord>, LineageError> {
    Coordinator::new(config, storage)?.scrape_one(url).await
}

/// Runs a complete crawl operation
///
/// This is the main entry point for crawling. It will:
/// 1. Seed the frontier from identifiers already stored
/// 2. Fetch the seed, or resume around it when it is already stored
/// 3. Promote discovered URLs left by earlier sessions
/// 4. Fetch with a bounded worker pool until `options.limit` records are stored
///
/// # Returns
///
/// * `Ok(usize)` - Number of records fetched by this call
/// * `Err(LineageError)` - Crawl failed to start
pub async fn crawl(
    config: Config,
    storage: Arc<Mutex<SqliteStorage>>,
    seed_url: &str,
    options: CrawlOptions,
) -> Result<usize, LineageError> {
    Coordinator::new(config, storage)?.crawl(seed_url, &options).await
}

/// Retries every discovered URL that has no stored record yet
pub async fn retry_pending(
    config: Config,
    storage: Arc<Mutex<SqliteStorage>>,
    options: CrawlOptions,
) -> Result<usize, LineageError> {
    Coordinator::new(config, storage)?.retry_pending(&options).await
}
