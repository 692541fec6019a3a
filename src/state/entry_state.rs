/// Frontier entry states for tracking an identifier within one session
///
/// Every identifier the frontier has ever seen maps to exactly one of these
/// states, which keeps the visited / pending / queued sets disjoint.
use std::fmt;

/// Represents where an identifier stands in the current crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Offered and waiting to be claimed by a worker
    Queued,

    /// Claimed by a worker; a fetch is in flight
    Pending,

    /// Fetched and stored (this session or an earlier one)
    Visited,

    /// A fetch was attempted and abandoned; not re-queued this session
    Released,
}

impl EntryState {
    /// Returns true if a worker has not finished with this identifier yet
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Pending)
    }

    /// Returns true if no further transition is possible this session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Visited | Self::Released)
    }

    /// Returns true if the transition `self -> next` is allowed
    ///
    /// `Visited` is permanent. `Released` may still become `Visited` when a
    /// concurrent worker commits the same record from another page.
    pub fn can_transition_to(&self, next: EntryState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Pending)
                | (Self::Pending, Self::Visited)
                | (Self::Pending, Self::Released)
                | (Self::Queued, Self::Visited)
                | (Self::Released, Self::Visited)
        )
    }

    /// Short lowercase label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Visited => "visited",
            Self::Released => "released",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
