//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryState`: where an identifier stands in the frontier (queued, pending, visited, released)
//! - `AttemptOutcome` / `FailureKind`: classification of a single fetch attempt
//! - `RetryPolicy`: backoff schedule between attempts

mod attempt;
mod entry_state;

// Re-export main types
pub use attempt::{AttemptOutcome, FailureKind, RetryPolicy};
pub use entry_state::EntryState;
