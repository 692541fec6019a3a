//! Configuration module for the lineage crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the crawler also runs without a file.
//!
//! # Example
//!
//! ```no_run
//! use lineage_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lineage.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
