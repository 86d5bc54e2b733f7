//! Bounded, shared history of recent request events.
//!
//! The store is a copy-on-write ring buffer. Readers take a snapshot (an `Arc`
//! clone, under a lock held only for the clone) and scan it without holding
//! any lock. Writers mutate in place when no snapshot is outstanding and copy
//! the buffer otherwise, so a scan never observes appends or evictions that
//! happened after it started.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::event::RequestEvent;

/// Default number of events kept before the oldest are evicted.
pub const DEFAULT_CAPACITY: usize = 1000;

type Events = VecDeque<Arc<RequestEvent>>;

/// Insertion-ordered event history with a global capacity bound.
///
/// Eviction ignores addresses: once the store is over capacity the oldest
/// event goes, whichever client it belongs to.
#[derive(Debug)]
pub struct EventStore {
    events: RwLock<Arc<Events>>,
    capacity: usize,
}

impl EventStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store holding roughly `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: RwLock::new(Arc::new(VecDeque::with_capacity(capacity + 1))),
            capacity,
        }
    }

    /// Record an event.
    ///
    /// Eviction runs before the push, so the store holds at most
    /// `capacity + 1` events afterwards.
    pub fn append(&self, event: RequestEvent) {
        let event = Arc::new(event);
        let mut guard = self.events.write();
        let events = Arc::make_mut(&mut *guard);

        while events.len() > self.capacity {
            if let Some(evicted) = events.pop_front() {
                trace!(address = %evicted.address(), "Evicted oldest request event");
            }
        }
        events.push_back(event);
    }

    /// Take a stable view of the current history.
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            events: Arc::clone(&self.events.read()),
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// The configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable view of the store taken at a point in time.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    events: Arc<Events>,
}

impl EventSnapshot {
    /// Iterate events in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RequestEvent> + '_ {
        self.events.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
