//! Output module for exporting the store and reporting on it
//!
//! This module handles:
//! - Exporting persons and rebuilt families as GEDCOM 5.5.1
//! - Loading and printing store statistics

pub mod gedcom;
pub mod stats;

pub use gedcom::{export_gedcom, format_gedcom, ExportSummary};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
