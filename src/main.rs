//! Lineage crawler main entry point
//!
//! This is the command-line interface for the lineage crawler.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use lineage_crawler::config::{load_config_with_hash, Config};
use lineage_crawler::crawler::{Coordinator, CrawlOptions};
use lineage_crawler::output::{export_gedcom, load_statistics, print_statistics};
use lineage_crawler::storage::{open_storage, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Lineage crawler: a polite genealogy graph harvester
///
/// Walks a genealogy site person by person, stores every record and
/// relationship it finds, and exports the result as GEDCOM.
#[derive(Parser, Debug)]
#[command(name = "lineage-crawler")]
#[command(version)]
#[command(about = "A polite genealogy graph harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the configuration)
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and store a single person page
    Scrape {
        /// Person page URL
        url: String,
    },

    /// Crawl outward from a seed page
    Crawl {
        /// Seed URL (defaults to site.seed-url)
        url: Option<String>,

        #[command(flatten)]
        pool: PoolArgs,
    },

    /// Retry discovered URLs that were never fetched
    Retry {
        #[command(flatten)]
        pool: PoolArgs,
    },

    /// Export the store as GEDCOM 5.5.1
    Export {
        /// Output file (defaults to output.gedcom-path)
        output: Option<PathBuf>,
    },

    /// Show statistics from the database
    Stats,
}

#[derive(Args, Debug)]
struct PoolArgs {
    /// Maximum number of records to fetch
    #[arg(long)]
    limit: Option<usize>,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Politeness delay before each request, in seconds
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,
}

impl PoolArgs {
    fn options(&self, config: &Config) -> anyhow::Result<CrawlOptions> {
        let mut options = CrawlOptions::from_config(config);
        if let Some(limit) = self.limit {
            options.limit = limit;
        }
        if let Some(workers) = self.workers {
            if workers == 0 {
                bail!("--workers must be at least 1");
            }
            options.concurrency = workers;
        }
        if let Some(delay) = self.delay {
            options.delay = Duration::try_from_secs_f64(delay)
                .with_context(|| format!("invalid --delay value: {}", delay))?;
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_configuration(cli.config.as_deref())?;
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.database_path));

    match cli.command {
        Command::Scrape { url } => handle_scrape(config, &db_path, &url, config_hash).await,
        Command::Crawl { url, pool } => {
            let seed = match url.or_else(|| config.site.seed_url.clone()) {
                Some(seed) => seed,
                None => bail!("no seed URL given and site.seed-url is not configured"),
            };
            let options = pool.options(&config)?;
            handle_crawl(config, &db_path, &seed, options, config_hash).await
        }
        Command::Retry { pool } => {
            let options = pool.options(&config)?;
            handle_retry(config, &db_path, options, config_hash).await
        }
        Command::Export { output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.gedcom_path));
            handle_export(&db_path, &output)
        }
        Command::Stats => handle_stats(&db_path),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lineage_crawler=info,warn"),
            1 => EnvFilter::new("lineage_crawler=debug,info"),
            2 => EnvFilter::new("lineage_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load_configuration(path: Option<&Path>) -> anyhow::Result<(Config, String)> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, hash))
        }
        None => {
            tracing::debug!("No configuration file given; using defaults");
            Ok((Config::default(), "defaults".to_string()))
        }
    }
}

fn shared_storage(db_path: &Path) -> anyhow::Result<Arc<Mutex<SqliteStorage>>> {
    let storage = open_storage(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// Handles `scrape`: one page, edges stored but not followed
async fn handle_scrape(config: Config, db_path: &Path, url: &str, config_hash: String) -> anyhow::Result<()> {
    let storage = shared_storage(db_path)?;
    let coordinator = Coordinator::new(config, storage)?.with_config_hash(config_hash);

    match coordinator.scrape_one(url).await? {
        Some(record) => {
            println!("✓ Stored {} ({})", record.id, record.name.as_deref().unwrap_or("unnamed"));
            if let Some(birth) = record.birth_date_civil.as_deref().or(record.birth_date.as_deref()) {
                println!("  Born: {}", birth);
            }
            if let Some(death) = record.death_date_civil.as_deref().or(record.death_date.as_deref()) {
                println!("  Died: {}", death);
            }
        }
        None => println!("No person record found at {}", url),
    }
    Ok(())
}

/// Handles `crawl`
async fn handle_crawl(
    config: Config,
    db_path: &Path,
    seed: &str,
    options: CrawlOptions,
    config_hash: String,
) -> anyhow::Result<()> {
    let storage = shared_storage(db_path)?;
    tracing::info!(
        "Crawling from {} (limit {}, {} workers, delay {:?})",
        seed,
        options.limit,
        options.concurrency,
        options.delay
    );

    let fetched = Coordinator::new(config, storage)?
        .with_config_hash(config_hash)
        .crawl(seed, &options)
        .await
        .map_err(|e| {
            tracing::error!("Crawl failed: {}", e);
            e
        })?;

    println!("✓ Crawl complete: {} records fetched", fetched);
    Ok(())
}

/// Handles `retry`
async fn handle_retry(
    config: Config,
    db_path: &Path,
    options: CrawlOptions,
    config_hash: String,
) -> anyhow::Result<()> {
    let storage = shared_storage(db_path)?;
    let fetched = Coordinator::new(config, storage)?
        .with_config_hash(config_hash)
        .retry_pending(&options)
        .await?;

    println!("✓ Retry complete: {} records fetched", fetched);
    Ok(())
}

/// Handles `export`: writes the store as GEDCOM
fn handle_export(db_path: &Path, output: &Path) -> anyhow::Result<()> {
    println!("=== Exporting GEDCOM ===\n");
    println!("Database: {}", db_path.display());
    println!("Output: {}", output.display());
    println!();

    let storage = open_storage(db_path)?;
    let summary = export_gedcom(&storage, output)?;

    println!(
        "✓ Exported {} individuals and {} families",
        summary.individuals, summary.families
    );
    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(db_path: &Path) -> anyhow::Result<()> {
    println!("Database: {}\n", db_path.display());

    let storage = open_storage(db_path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}
