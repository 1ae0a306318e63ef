//! Concurrency Guard: at most one in-flight operation per resource key.
//!
//! Background work (poll ticks, auto-refresh, opportunistic pre-fetch) runs
//! through `ConcurrencyGuard::run`; a second call under a held key is dropped,
//! not queued. User-initiated refreshes skip the guard entirely.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::models::ticket::TicketId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Applications,
    FilteringStatus,
    StartFiltering,
    TopCandidates,
    FilteringReport,
    SendTopCandidates,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Applications => "applications",
            Resource::FilteringStatus => "status-poll",
            Resource::StartFiltering => "filter-trigger",
            Resource::TopCandidates => "top-candidates",
            Resource::FilteringReport => "filtering-report",
            Resource::SendTopCandidates => "send-top-candidates",
        }
    }
}

/// `(resource, ticket)`. The ticket is optional for global listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuardKey {
    pub resource: Resource,
    pub ticket: Option<TicketId>,
}

impl GuardKey {
    pub fn new(resource: Resource, ticket: &TicketId) -> Self {
        Self {
            resource,
            ticket: Some(ticket.clone()),
        }
    }

    pub fn global(resource: Resource) -> Self {
        Self {
            resource,
            ticket: None,
        }
    }
}

impl fmt::Display for GuardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ticket {
            Some(ticket) => write!(f, "{}:{}", self.resource.as_str(), ticket),
            None => f.write_str(self.resource.as_str()),
        }
    }
}

#[derive(Default)]
pub struct ConcurrencyGuard {
    in_flight: DashMap<GuardKey, ()>,
    acquired: AtomicU64,
    dropped: AtomicU64,
}

/// Holds a key for as long as it lives. Released on drop, including when the
/// guarded future is cancelled.
pub struct GuardPermit<'a> {
    guard: &'a ConcurrencyGuard,
    key: GuardKey,
}

impl Drop for GuardPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.remove(&self.key);
    }
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: GuardKey) -> Option<GuardPermit<'_>> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(());
                self.acquired.fetch_add(1, Ordering::Relaxed);
                Some(GuardPermit { guard: self, key })
            }
        }
    }

    /// Runs `operation` unless the key is already held, in which case the
    /// operation is never polled and `None` is returned.
    pub async fn run<F, T>(&self, key: GuardKey, operation: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let Some(_permit) = self.try_acquire(key.clone()) else {
            debug!("Skipping {key}: already in flight");
            return None;
        };
        Some(operation.await)
    }

    pub fn is_in_flight(&self, key: &GuardKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn acquired_total(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
