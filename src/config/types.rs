use serde::Deserialize;

/// Main configuration structure for the lineage crawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    pub concurrency: usize,

    /// Default number of successful fetches per session
    pub limit: usize,

    /// Politeness delay before every fetch attempt (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Deadline for a single fetch attempt (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Fixed wait before retrying a transient failure (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Rate-limited attempts wait `base^attempt` seconds
    #[serde(rename = "rate-limit-backoff-base")]
    pub rate_limit_backoff_base: f64,

    /// Attempts per item, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            limit: 100,
            delay_ms: 1000,
            timeout_secs: 30,
            retry_backoff_ms: 2000,
            rate_limit_backoff_base: 2.0,
            max_attempts: 2,
        }
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Default seed used when `crawl` is invoked without a URL
    #[serde(rename = "seed-url")]
    pub seed_url: Option<String>,

    /// Query parameter carrying the person identifier (`?i=123`)
    #[serde(rename = "id-param")]
    pub id_param: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            seed_url: None,
            id_param: "i".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "lineage-crawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.org/about".to_string(),
            contact_email: "admin@example.org".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Default path for GEDCOM exports
    #[serde(rename = "gedcom-path")]
    pub gedcom_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "genealogy.db".to_string(),
            gedcom_path: "genealogy.ged".to_string(),
        }
    }
}
