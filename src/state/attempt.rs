//! Outcome classification for a single fetch attempt
//!
//! Each attempt moves `Fetching -> {Success, RateLimited, Transient, Fatal}`.
//! The ingest unit decides from the outcome whether to retry, and which
//! backoff schedule to use.

use std::fmt;
use std::time::Duration;

/// Longest wait a rate-limited attempt will ever schedule
pub const MAX_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(3600);

/// Why an attempt did not produce a usable record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, DNS failure, TLS error
    ConnectionFailure,

    /// The attempt exceeded its deadline
    TimeoutFailure,

    /// HTTP 429
    RateLimited,

    /// Any other non-2xx status
    HttpStatus(u16),

    /// 2xx with an empty body
    EmptyBody,

    /// The page was fetched but held no person record
    MalformedContent,

    /// The request could not even be built (bad URL, client misuse)
    InvalidRequest(String),
}

impl FailureKind {
    /// Classifies this failure into an attempt outcome
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::RateLimited => AttemptOutcome::RateLimited,
            Self::InvalidRequest(_) => AttemptOutcome::Fatal,
            Self::ConnectionFailure
            | Self::TimeoutFailure
            | Self::HttpStatus(_)
            | Self::EmptyBody
            | Self::MalformedContent => AttemptOutcome::Transient,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailure => write!(f, "connection failure"),
            Self::TimeoutFailure => write!(f, "request timed out"),
            Self::RateLimited => write!(f, "rate limited (HTTP 429)"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::EmptyBody => write!(f, "empty response body"),
            Self::MalformedContent => write!(f, "no person record on page"),
            Self::InvalidRequest(reason) => write!(f, "invalid request: {}", reason),
        }
    }
}

/// Terminal state of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    Success,
    RateLimited,
    Transient,
    Fatal,
}

impl AttemptOutcome {
    /// Returns true if another attempt may follow this one
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient)
    }
}

/// Backoff schedule applied between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per item, including the first one
    pub max_attempts: u32,

    /// Wait before retrying a transient failure
    pub transient_backoff: Duration,

    /// Rate-limited attempts wait `base^attempt` seconds
    pub rate_limit_base: f64,
}

impl RetryPolicy {
    /// Returns the wait before the next attempt, or `None` if the item
    /// should be abandoned
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn backoff(&self, outcome: AttemptOutcome, attempt: u32) -> Option<Duration> {
        if !outcome.is_retryable() || attempt >= self.max_attempts {
            return None;
        }

        match outcome {
            AttemptOutcome::RateLimited => {
                let secs = self.rate_limit_base.powi(attempt as i32).max(0.0);
                let wait = Duration::try_from_secs_f64(secs).unwrap_or(MAX_RATE_LIMIT_BACKOFF);
                Some(wait.min(MAX_RATE_LIMIT_BACKOFF))
            }
            _ => Some(self.transient_backoff),
        }
    }
}
