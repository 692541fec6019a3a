//! Per-item fetch, extract and store unit
//!
//! One call handles one claimed identifier from start to finish: politeness
//! delay, fetch, classification, bounded retry, extraction and persistence.
//! Failures never escape as errors; they end as [`IngestOutcome::Abandoned`]
//! and the identifier is released from the frontier.

use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{parse_person_page, ExtractedEdge};
use crate::state::{FailureKind, RetryPolicy};
use crate::storage::{PersonRecord, SqliteStorage, Storage};
use crate::LineageError;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Everything a worker needs, shared by all workers of one session
pub struct IngestContext {
    pub client: Client,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub frontier: Arc<Frontier>,
    /// Query parameter carrying the person identifier
    pub id_param: String,
    /// Politeness delay before every attempt
    pub delay: Duration,
    pub policy: RetryPolicy,
}

/// How an item ended
#[derive(Debug)]
pub enum IngestOutcome {
    /// The record and its edges were stored
    Ingested {
        record: PersonRecord,
        edges: Vec<ExtractedEdge>,
    },

    /// The page had no identifier, or another worker stored it first
    Skipped,

    /// Every attempt failed; the identifier was released
    Abandoned { reason: FailureKind },
}

/// Fetches, extracts and stores one claimed identifier
///
/// # Returns
///
/// * `Ok(IngestOutcome)` - How the item ended
/// * `Err(LineageError)` - The store or the frontier lock failed
pub async fn ingest(ctx: &IngestContext, id: &str, url: &str) -> Result<IngestOutcome, LineageError> {
    let page_url = match Url::parse(url) {
        Ok(page_url) => page_url,
        Err(e) => return abandon(ctx, id, url, FailureKind::InvalidRequest(e.to_string())),
    };

    let mut attempt = 0;
    loop {
        attempt += 1;

        if !ctx.delay.is_zero() {
            tokio::time::sleep(ctx.delay).await;
        }

        let failure = match fetch_url(&ctx.client, url).await {
            FetchResult::Success { body, .. } => match parse_person_page(&body, &page_url, &ctx.id_param) {
                Some((record, edges)) => return store(ctx, id, record, edges),
                None => FailureKind::MalformedContent,
            },
            FetchResult::Failed(kind) => kind,
        };

        match ctx.policy.backoff(failure.outcome(), attempt) {
            Some(wait) => {
                warn!(
                    "Attempt {} for {} failed ({}); retrying in {:?}",
                    attempt, url, failure, wait
                );
                tokio::time::sleep(wait).await;
            }
            None => return abandon(ctx, id, url, failure),
        }
    }
}

fn abandon(ctx: &IngestContext, id: &str, url: &str, reason: FailureKind) -> Result<IngestOutcome, LineageError> {
    warn!("Giving up on {} ({}): {}", id, url, reason);
    ctx.frontier.release(id)?;
    Ok(IngestOutcome::Abandoned { reason })
}

/// Commits the record to the frontier, then persists it with its edges
fn store(
    ctx: &IngestContext,
    claimed_id: &str,
    record: PersonRecord,
    edges: Vec<ExtractedEdge>,
) -> Result<IngestOutcome, LineageError> {
    if record.id.is_empty() {
        debug!("Page for {} carries no identifier; skipping", claimed_id);
        ctx.frontier.release(claimed_id)?;
        return Ok(IngestOutcome::Skipped);
    }

    if record.id != claimed_id {
        ctx.frontier.release(claimed_id)?;
    }

    if !ctx.frontier.commit(&record.id)? {
        debug!("{} was stored by another worker; skipping", record.id);
        return Ok(IngestOutcome::Skipped);
    }

    {
        let mut storage = ctx.storage.lock().map_err(|_| LineageError::LockPoisoned)?;
        storage.upsert_person(&record)?;
        for edge in &edges {
            storage.add_edge(&record.id, &edge.related_id, edge.kind)?;
        }
    }

    Ok(IngestOutcome::Ingested { record, edges })
}
