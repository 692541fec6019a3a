//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl controller, which:
//! - Seeds the frontier from identifiers already in the store
//! - Fetches the explicit seed synchronously, or resumes around it
//! - Drives a bounded pool of workers until the limit is reached or the
//!   frontier runs dry
//! - Feeds every discovered edge back into the frontier and the durable
//!   discovered-URL store
//! - Records each call as a session

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::Frontier;
use crate::crawler::ingest::{ingest, IngestContext, IngestOutcome};
use crate::crawler::parser::ExtractedEdge;
use crate::state::RetryPolicy;
use crate::storage::{PersonRecord, SessionMode, SessionStatus, SqliteStorage, Storage};
use crate::url::{parse_seed, with_person_id};
use crate::LineageError;
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// Per-call crawl parameters
#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    /// Maximum number of successful fetches in this call, seed included
    pub limit: usize,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Politeness delay before every attempt
    pub delay: Duration,
}

impl CrawlOptions {
    /// Takes limit, concurrency and delay from the crawler configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            limit: config.crawler.limit,
            concurrency: config.crawler.concurrency,
            delay: Duration::from_millis(config.crawler.delay_ms),
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    config_hash: String,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - The shared store; the lock is only held per call
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(LineageError)` - The HTTP client could not be built
    pub fn new(config: Config, storage: Arc<Mutex<SqliteStorage>>) -> Result<Self, LineageError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.timeout_secs),
        )?;

        Ok(Self {
            config: Arc::new(config),
            storage,
            client,
            config_hash: "defaults".to_string(),
        })
    }

    /// Sets the configuration hash recorded on each session
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    fn storage(&self) -> Result<MutexGuard<'_, SqliteStorage>, LineageError> {
        self.storage.lock().map_err(|_| LineageError::LockPoisoned)
    }

    fn id_param(&self) -> &str {
        &self.config.site.id_param
    }

    fn context(&self, frontier: Arc<Frontier>, delay: Duration) -> Arc<IngestContext> {
        let crawler = &self.config.crawler;
        Arc::new(IngestContext {
            client: self.client.clone(),
            storage: Arc::clone(&self.storage),
            frontier,
            id_param: self.id_param().to_string(),
            delay,
            policy: RetryPolicy {
                max_attempts: crawler.max_attempts,
                transient_backoff: Duration::from_millis(crawler.retry_backoff_ms),
                rate_limit_base: crawler.rate_limit_backoff_base,
            },
        })
    }

    /// Creates a frontier whose visited set is every stored identifier
    fn seeded_frontier(&self) -> Result<Arc<Frontier>, LineageError> {
        let known = self.storage()?.list_all_person_ids()?;
        debug!("Seeding frontier with {} stored identifiers", known.len());
        let frontier = Arc::new(Frontier::new());
        frontier.seed(known)?;
        Ok(frontier)
    }

    // ===== Entry points =====

    /// Fetches and stores a single page
    ///
    /// The page is fetched even if its record is already stored. Its edges
    /// are stored and their targets recorded as discovered, but not crawled.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(PersonRecord))` - The stored record
    /// * `Ok(None)` - The page carried no identifier
    /// * `Err(LineageError)` - The seed is invalid or could not be fetched
    pub async fn scrape_one(&self, seed_url: &str) -> Result<Option<PersonRecord>, LineageError> {
        let (seed, seed_id) = parse_seed(seed_url, self.id_param())?;
        let session_id = self.open_session(SessionMode::Scrape, Some(seed_url))?;

        let result = self.scrape_seed(&seed, &seed_id).await;
        let fetched = matches!(result, Ok(Some(_))) as usize;
        self.close_session(session_id, result.is_ok(), fetched)?;
        result
    }

    async fn scrape_seed(&self, seed: &Url, seed_id: &str) -> Result<Option<PersonRecord>, LineageError> {
        let frontier = Arc::new(Frontier::new());
        frontier.begin(seed_id)?;
        let ctx = self.context(Arc::clone(&frontier), Duration::from_millis(self.config.crawler.delay_ms));

        match ingest(&ctx, seed_id, seed.as_str()).await? {
            IngestOutcome::Ingested { record, edges } => {
                let known = self.storage()?.list_all_person_ids()?;
                frontier.seed(known)?;
                self.enqueue_edges(&frontier, &edges)?;
                info!("Stored {} ({} relationships)", record.id, edges.len());
                Ok(Some(record))
            }
            IngestOutcome::Skipped => Ok(None),
            IngestOutcome::Abandoned { reason } => Err(LineageError::SeedFetch {
                url: seed.to_string(),
                reason: reason.to_string(),
            }),
        }
    }

    /// Crawls outward from `seed_url`
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of records fetched and stored by this call
    /// * `Err(LineageError)` - The seed is invalid or its first fetch failed
    pub async fn crawl(&self, seed_url: &str, options: &CrawlOptions) -> Result<usize, LineageError> {
        let (seed, seed_id) = parse_seed(seed_url, self.id_param())?;
        let session_id = self.open_session(SessionMode::Crawl, Some(seed_url))?;

        let result = self.crawl_from(&seed, &seed_id, options).await;
        self.close_session(session_id, result.is_ok(), result.as_ref().map_or(0, |n| *n))?;
        result
    }

    async fn crawl_from(&self, seed: &Url, seed_id: &str, options: &CrawlOptions) -> Result<usize, LineageError> {
        if options.limit == 0 {
            info!("Limit is 0; nothing to fetch");
            return Ok(0);
        }

        let frontier = self.seeded_frontier()?;
        let ctx = self.context(Arc::clone(&frontier), options.delay);
        let mut successes = 0;

        if frontier.is_visited(seed_id)? {
            info!("Seed {} is already stored; resuming around it", seed_id);
            let replenished = self.replenish_from_seed(&frontier, seed, seed_id)?;
            debug!("Re-queued {} relatives of the seed", replenished);

            if frontier.queued_len()? < options.concurrency {
                let mined = self.mine_unresolved_edges(&frontier)?;
                debug!("Queued {} targets of unresolved edges", mined);
            }
        } else {
            info!("Fetching seed {}", seed);
            frontier.begin(seed_id)?;
            match ingest(&ctx, seed_id, seed.as_str()).await? {
                IngestOutcome::Ingested { record, edges } => {
                    successes += 1;
                    info!("[1/{}] Stored {} ({})", options.limit, record.id, display_name(&record));
                    self.enqueue_edges(&frontier, &edges)?;
                }
                IngestOutcome::Skipped => {}
                IngestOutcome::Abandoned { reason } => {
                    return Err(LineageError::SeedFetch {
                        url: seed.to_string(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        let remaining = options.limit.saturating_sub(successes);
        if remaining > 0 && frontier.queued_len()? < remaining {
            let promoted = self.promote_discovered(&frontier)?;
            if promoted > 0 {
                info!("Promoted {} previously discovered URLs", promoted);
            }
        }

        successes += self.drain(&ctx, options, successes).await?;
        info!("Crawl finished: {} records fetched", successes);
        Ok(successes)
    }

    /// Gives every discovered but unfetched URL another chance
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of records fetched and stored by this call
    pub async fn retry_pending(&self, options: &CrawlOptions) -> Result<usize, LineageError> {
        let session_id = self.open_session(SessionMode::Retry, None)?;
        let result = self.retry_discovered(options).await;
        self.close_session(session_id, result.is_ok(), result.as_ref().map_or(0, |n| *n))?;
        result
    }

    async fn retry_discovered(&self, options: &CrawlOptions) -> Result<usize, LineageError> {
        if options.limit == 0 {
            info!("Limit is 0; nothing to fetch");
            return Ok(0);
        }

        let frontier = self.seeded_frontier()?;
        let promoted = self.promote_discovered(&frontier)?;
        info!("Retrying {} pending URLs", promoted);

        let ctx = self.context(Arc::clone(&frontier), options.delay);
        let successes = self.drain(&ctx, options, 0).await?;
        info!("Retry finished: {} records fetched", successes);
        Ok(successes)
    }

    // ===== Worker pool =====

    /// Runs workers until the limit is reached or nothing is queued or in flight
    ///
    /// A new item is claimed only while `successes + in_flight < limit`, so
    /// the limit is never exceeded. In-flight tasks always run to completion.
    async fn drain(
        &self,
        ctx: &Arc<IngestContext>,
        options: &CrawlOptions,
        already: usize,
    ) -> Result<usize, LineageError> {
        let frontier = &ctx.frontier;
        let concurrency = options.concurrency.max(1);
        let mut join_set = JoinSet::new();
        let mut successes = 0;
        let mut abandoned = 0;
        let start_time = Instant::now();

        loop {
            while already + successes + join_set.len() < options.limit && join_set.len() < concurrency {
                let Some((id, url)) = frontier.claim()? else {
                    break;
                };
                debug!("Dispatching {} ({})", id, url);
                let ctx = Arc::clone(ctx);
                join_set.spawn(async move {
                    let outcome = ingest(&ctx, &id, &url).await;
                    (id, outcome)
                });
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };
            let (id, outcome) = joined.map_err(|e| LineageError::Task(e.to_string()))?;

            match outcome {
                Ok(IngestOutcome::Ingested { record, edges }) => {
                    successes += 1;
                    info!(
                        "[{}/{}] Stored {} ({})",
                        already + successes,
                        options.limit,
                        record.id,
                        display_name(&record)
                    );
                    self.enqueue_edges(frontier, &edges)?;
                }
                Ok(IngestOutcome::Skipped) => debug!("Skipped {}", id),
                Ok(IngestOutcome::Abandoned { .. }) => abandoned += 1,
                Err(e) => {
                    error!("Failed to store {}: {}", id, e);
                    abandoned += 1;
                }
            }
        }

        if abandoned > 0 {
            warn!("{} items were abandoned this session", abandoned);
        }
        debug!(
            "Worker pool drained: {} stored in {:?}, {} still queued",
            successes,
            start_time.elapsed(),
            frontier.queued_len()?
        );

        Ok(successes)
    }

    // ===== Frontier replenishment =====

    /// Offers every edge target and records a URL hint for the new ones
    fn enqueue_edges(&self, frontier: &Frontier, edges: &[ExtractedEdge]) -> Result<(), LineageError> {
        let mut offered = Vec::new();
        for edge in edges {
            if frontier.offer(&edge.related_id, &edge.url)? {
                offered.push(edge);
            }
        }

        if !offered.is_empty() {
            let mut storage = self.storage()?;
            for edge in offered {
                storage.record_discovered(&edge.related_id, &edge.url)?;
            }
        }
        Ok(())
    }

    /// Re-offers the relatives of an already stored seed
    fn replenish_from_seed(&self, frontier: &Frontier, seed: &Url, seed_id: &str) -> Result<usize, LineageError> {
        let targets = {
            let storage = self.storage()?;
            let mut targets = Vec::new();
            for edge in storage.get_edges(seed_id)? {
                let url = match storage.get_discovered_url(&edge.related_id)? {
                    Some(url) => url,
                    None => with_person_id(seed, self.id_param(), &edge.related_id).to_string(),
                };
                targets.push((edge.related_id, url));
            }
            targets
        };

        self.offer_and_record(frontier, targets)
    }

    /// Queues targets of edges nobody has a URL for, guessing the URL from
    /// the page that asserted the edge
    fn mine_unresolved_edges(&self, frontier: &Frontier) -> Result<usize, LineageError> {
        let unresolved = self.storage()?.find_unresolved_edges()?;

        let targets = unresolved
            .into_iter()
            .filter_map(|edge| {
                let source = Url::parse(edge.source_url.as_deref()?).ok()?;
                let url = with_person_id(&source, self.id_param(), &edge.related_id);
                Some((edge.related_id, url.to_string()))
            })
            .collect();

        self.offer_and_record(frontier, targets)
    }

    fn offer_and_record(&self, frontier: &Frontier, targets: Vec<(String, String)>) -> Result<usize, LineageError> {
        let mut offered = Vec::new();
        for (id, url) in targets {
            if frontier.offer(&id, &url)? {
                offered.push((id, url));
            }
        }

        if !offered.is_empty() {
            let mut storage = self.storage()?;
            for (id, url) in &offered {
                storage.record_discovered(id, url)?;
            }
        }
        Ok(offered.len())
    }

    /// Offers every discovered URL whose identifier has no stored record
    fn promote_discovered(&self, frontier: &Frontier) -> Result<usize, LineageError> {
        let pending = self.storage()?.list_unfetched_discovered()?;
        let mut promoted = 0;
        for hint in pending {
            if frontier.offer(&hint.id, &hint.url)? {
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    // ===== Sessions =====

    fn open_session(&self, mode: SessionMode, seed_url: Option<&str>) -> Result<i64, LineageError> {
        let session_id = self.storage()?.create_session(mode, seed_url, &self.config_hash)?;
        info!("Started {} session {}", mode.to_db_string(), session_id);
        Ok(session_id)
    }

    fn close_session(&self, session_id: i64, succeeded: bool, fetched: usize) -> Result<(), LineageError> {
        let status = if succeeded {
            SessionStatus::Completed
        } else {
            SessionStatus::Failed
        };
        self.storage()?
            .finish_session(session_id, status, fetched as u64)?;
        Ok(())
    }
}

fn display_name(record: &PersonRecord) -> &str {
    record.name.as_deref().unwrap_or("unnamed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfig;
    use crate::storage::RelationType;

    fn create_test_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                delay_ms: 0,
                retry_backoff_ms: 0,
                rate_limit_backoff_base: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn coordinator() -> Coordinator {
        let storage = Arc::new(Mutex::new(SqliteStorage::open_in_memory().unwrap()));
        Coordinator::new(create_test_config(), storage).unwrap()
    }

    fn person(id: &str, url: &str) -> PersonRecord {
        PersonRecord {
            id: id.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_options_from_config() {
        let options = CrawlOptions::from_config(&Config::default());
        assert_eq!(options.limit, 100);
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_seeded_frontier_marks_stored_ids_visited() {
        let coordinator = coordinator();
        coordinator
            .storage()
            .unwrap()
            .upsert_person(&person("p1", "http://x/?i=p1"))
            .unwrap();

        let frontier = coordinator.seeded_frontier().unwrap();
        assert!(frontier.is_visited("p1").unwrap());
        assert!(!frontier.is_visited("p2").unwrap());
    }

    #[test]
    fn test_enqueue_edges_records_new_hints_only() {
        let coordinator = coordinator();
        let frontier = Frontier::new();
        frontier.seed(vec!["p1".to_string()]).unwrap();

        let edges = vec![
            ExtractedEdge {
                related_id: "p1".into(),
                kind: RelationType::Father,
                url: "http://x/?i=p1".into(),
            },
            ExtractedEdge {
                related_id: "p2".into(),
                kind: RelationType::Child,
                url: "http://x/?i=p2".into(),
            },
        ];
        coordinator.enqueue_edges(&frontier, &edges).unwrap();

        assert_eq!(frontier.queued_len().unwrap(), 1);
        let storage = coordinator.storage().unwrap();
        assert_eq!(storage.get_discovered_url("p1").unwrap(), None);
        assert_eq!(
            storage.get_discovered_url("p2").unwrap().as_deref(),
            Some("http://x/?i=p2")
        );
    }

    #[test]
    fn test_replenish_from_seed_synthesizes_missing_urls() {
        let coordinator = coordinator();
        {
            let mut storage = coordinator.storage().unwrap();
            storage.upsert_person(&person("p1", "http://x/tree?i=p1")).unwrap();
            storage.add_edge("p1", "p2", RelationType::Father).unwrap();
            storage.add_edge("p1", "p3", RelationType::Mother).unwrap();
            storage.record_discovered("p3", "http://mirror/?i=p3").unwrap();
        }

        let frontier = coordinator.seeded_frontier().unwrap();
        let seed = Url::parse("http://x/tree?i=p1").unwrap();
        let offered = coordinator.replenish_from_seed(&frontier, &seed, "p1").unwrap();
        assert_eq!(offered, 2);

        let first = frontier.claim().unwrap().unwrap();
        assert_eq!(first, ("p2".to_string(), "http://x/tree?i=p2".to_string()));
        let second = frontier.claim().unwrap().unwrap();
        assert_eq!(second, ("p3".to_string(), "http://mirror/?i=p3".to_string()));
    }

    #[test]
    fn test_mine_unresolved_edges() {
        let coordinator = coordinator();
        {
            let mut storage = coordinator.storage().unwrap();
            storage.upsert_person(&person("p1", "http://x/?i=p1&lang=he")).unwrap();
            storage.add_edge("p1", "p9", RelationType::Child).unwrap();
        }

        let frontier = coordinator.seeded_frontier().unwrap();
        assert_eq!(coordinator.mine_unresolved_edges(&frontier).unwrap(), 1);
        assert_eq!(
            frontier.claim().unwrap(),
            Some(("p9".to_string(), "http://x/?i=p9&lang=he".to_string()))
        );
        assert!(coordinator
            .storage()
            .unwrap()
            .get_discovered_url("p9")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_promote_discovered_skips_fetched() {
        let coordinator = coordinator();
        {
            let mut storage = coordinator.storage().unwrap();
            storage.upsert_person(&person("p1", "http://x/?i=p1")).unwrap();
            storage.record_discovered("p1", "http://x/?i=p1").unwrap();
            storage.record_discovered("p2", "http://x/?i=p2").unwrap();
        }

        let frontier = coordinator.seeded_frontier().unwrap();
        assert_eq!(coordinator.promote_discovered(&frontier).unwrap(), 1);
        assert_eq!(frontier.claim().unwrap().unwrap().0, "p2");
    }

    #[tokio::test]
    async fn test_zero_limit_fetches_nothing() {
        let coordinator = coordinator();
        let options = CrawlOptions {
            limit: 0,
            concurrency: 2,
            delay: Duration::ZERO,
        };
        let fetched = coordinator
            .crawl("http://127.0.0.1:9/?i=p1", &options)
            .await
            .unwrap();
        assert_eq!(fetched, 0);

        let sessions = coordinator.storage().unwrap().list_recent_sessions(1).unwrap();
        assert_eq!(sessions[0].status, SessionStatus::Completed);
        assert_eq!(sessions[0].mode, SessionMode::Crawl);
    }

    #[tokio::test]
    async fn test_seed_without_identifier_is_rejected() {
        let coordinator = coordinator();
        let options = CrawlOptions::from_config(&create_test_config());
        let result = coordinator.crawl("http://127.0.0.1:9/", &options).await;
        assert!(matches!(result, Err(LineageError::InvalidSeed(_))));
    }
}
