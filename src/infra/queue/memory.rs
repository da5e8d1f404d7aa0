//! In-memory event queue.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::StoreError;
use crate::eventengine::{Event, EventId, EventQueue, NewEvent, NEW_EVENT_CHANNEL};
use crate::infra::notify::NotificationHub;
use crate::util::now_ms;

struct QueueState {
    next_id: EventId,
    events: BTreeMap<EventId, Event>,
}

/// Event queue held in memory, keyed by identity so fetches come back in
/// ascending order.
pub struct InMemoryEventQueue {
    state: Mutex<QueueState>,
    notifications: Option<Arc<NotificationHub>>,
    failing_fetches: AtomicUsize,
    fetches: AtomicUsize,
}

impl Default for InMemoryEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventQueue {
    /// Create an empty queue without notifications.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                next_id: 1,
                events: BTreeMap::new(),
            }),
            notifications: None,
            failing_fetches: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Publish on [`NEW_EVENT_CHANNEL`] through `hub` after every insert.
    #[must_use]
    pub fn with_notifications(mut self, hub: Arc<NotificationHub>) -> Self {
        self.notifications = Some(hub);
        self
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    /// Whether an event is still stored.
    #[must_use]
    pub fn contains(&self, id: EventId) -> bool {
        self.state.lock().events.contains_key(&id)
    }

    /// Stored identities, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<EventId> {
        self.state.lock().events.keys().copied().collect()
    }

    /// Make the next `n` fetches fail with a connection error.
    pub fn fail_next_fetches(&self, n: usize) {
        self.failing_fetches.store(n, Ordering::Release);
    }

    /// Number of fetch attempts, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Acquire)
    }
}

#[async_trait]
impl EventQueue for InMemoryEventQueue {
    async fn insert(&self, event: NewEvent) -> Result<EventId, StoreError> {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.events.insert(id, event.with_id(id, now_ms()));
            id
        };
        if let Some(hub) = &self.notifications {
            hub.publish(NEW_EVENT_CHANNEL);
        }
        Ok(id)
    }

    async fn fetch_after(&self, target: &str, last_seen: EventId) -> Result<Vec<Event>, StoreError> {
        self.fetches.fetch_add(1, Ordering::AcqRel);
        let failing = self
            .failing_fetches
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StoreError::ConnectionLost("event queue unreachable".into()));
        }
        let state = self.state.lock();
        Ok(state
            .events
            .range(last_seen.saturating_add(1)..)
            .map(|(_, event)| event)
            .filter(|event| event.target == target)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: EventId) -> Result<bool, StoreError> {
        Ok(self.state.lock().events.remove(&id).is_some())
    }
}
