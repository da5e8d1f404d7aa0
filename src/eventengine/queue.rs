//! Persistent event queue collaborator.

use async_trait::async_trait;

use crate::core::StoreError;
use crate::eventengine::event::{Event, EventId, NewEvent};

/// Notification channel published on every insert.
pub const NEW_EVENT_CHANNEL: &str = "new_event";

/// Persistent queue of events addressed to named targets.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Insert an event, returning its newly assigned identity.
    async fn insert(&self, event: NewEvent) -> Result<EventId, StoreError>;

    /// Events for `target` with identity greater than `last_seen`, ascending.
    async fn fetch_after(&self, target: &str, last_seen: EventId) -> Result<Vec<Event>, StoreError>;

    /// Delete an event. Returns `false` if it was already gone.
    async fn delete(&self, id: EventId) -> Result<bool, StoreError>;
}
