//! In-memory crawl frontier
//!
//! Tracks every identifier seen in the current session as exactly one
//! [`EntryState`], which keeps the visited, pending and queued sets disjoint
//! and guarantees at most one fetch per identifier. All transitions happen
//! under one lock that is never held across I/O.

use crate::state::EntryState;
use crate::LineageError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

#[derive(Default)]
struct Inner {
    /// Identifier -> state, for every identifier ever seen this session
    entries: HashMap<String, EntryState>,

    /// Queued identifiers with the URL to fetch them from, in offer order
    queue: VecDeque<(String, String)>,
}

/// Thread-safe frontier shared by the controller and its workers
#[derive(Default)]
pub struct Frontier {
    inner: Mutex<Inner>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, LineageError> {
        self.inner.lock().map_err(|_| LineageError::LockPoisoned)
    }

    /// Marks identifiers already in the store as visited
    pub fn seed<I>(&self, ids: I) -> Result<(), LineageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut inner = self.lock()?;
        for id in ids {
            inner.entries.insert(id, EntryState::Visited);
        }
        Ok(())
    }

    /// Queues `id` unless it has been seen before in this session
    ///
    /// Returns true if the identifier was queued. Released identifiers stay
    /// out until the next session.
    pub fn offer(&self, id: &str, url: &str) -> Result<bool, LineageError> {
        let mut inner = self.lock()?;
        if let Some(state) = inner.entries.get(id) {
            trace!("Not queueing {}: already {}", id, state);
            return Ok(false);
        }

        inner.entries.insert(id.to_string(), EntryState::Queued);
        inner.queue.push_back((id.to_string(), url.to_string()));
        trace!("Queued {} ({})", id, url);
        Ok(true)
    }

    /// Moves the oldest queued identifier to pending
    ///
    /// Returns `None` when nothing is queued; never blocks.
    pub fn claim(&self) -> Result<Option<(String, String)>, LineageError> {
        let mut inner = self.lock()?;
        while let Some((id, url)) = inner.queue.pop_front() {
            // Entries committed from another page while queued are skipped
            if let Some(state) = inner.entries.get_mut(&id) {
                if *state == EntryState::Queued {
                    *state = EntryState::Pending;
                    return Ok(Some((id, url)));
                }
            }
        }
        Ok(None)
    }

    /// Marks an identifier pending without going through the queue
    ///
    /// Used for the explicit seed. Returns false if the identifier is
    /// already pending, visited or released.
    pub fn begin(&self, id: &str) -> Result<bool, LineageError> {
        let mut inner = self.lock()?;
        match inner.entries.get_mut(id) {
            Some(state) if *state == EntryState::Queued => {
                *state = EntryState::Pending;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                inner.entries.insert(id.to_string(), EntryState::Pending);
                Ok(true)
            }
        }
    }

    /// Marks `id` visited
    ///
    /// Returns false if it was already visited, which means another worker
    /// won the race for this record.
    pub fn commit(&self, id: &str) -> Result<bool, LineageError> {
        let mut inner = self.lock()?;
        match inner.entries.get_mut(id) {
            Some(state) if !state.can_transition_to(EntryState::Visited) => Ok(false),
            Some(state) => {
                *state = EntryState::Visited;
                Ok(true)
            }
            None => {
                inner.entries.insert(id.to_string(), EntryState::Visited);
                Ok(true)
            }
        }
    }

    /// Gives up on a pending identifier for the rest of the session
    pub fn release(&self, id: &str) -> Result<(), LineageError> {
        let mut inner = self.lock()?;
        if let Some(state) = inner.entries.get_mut(id) {
            if state.can_transition_to(EntryState::Released) {
                *state = EntryState::Released;
            }
        }
        Ok(())
    }

    /// Returns the state of `id`, if it has been seen this session
    pub fn state_of(&self, id: &str) -> Result<Option<EntryState>, LineageError> {
        Ok(self.lock()?.entries.get(id).copied())
    }

    /// Returns true if `id` is visited
    pub fn is_visited(&self, id: &str) -> Result<bool, LineageError> {
        Ok(self.state_of(id)? == Some(EntryState::Visited))
    }

    /// Number of identifiers waiting to be claimed
    pub fn queued_len(&self) -> Result<usize, LineageError> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .values()
            .filter(|state| **state == EntryState::Queued)
            .count())
    }
}
