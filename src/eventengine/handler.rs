//! Event handler plugins and the per-dispatch context they act on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{Capability, PluginError, SchedulerHandle, StoreError, TaskHandle, TaskResult};
use crate::eventengine::event::Event;
use crate::eventengine::queue::EventQueue;

/// Priority of delayed callbacks scheduled by handlers; queue checks use 0.
pub const PLUGIN_TASKS_PRIORITY: i32 = 1;

/// A handler instance, built for a single event.
#[async_trait]
pub trait EventHandler: Send {
    /// Process the event. Delete it through `ctx` once it is fully handled;
    /// leaving it in place holds it for a later queue check.
    async fn handle(&mut self, ctx: &mut EventContext) -> Result<(), PluginError>;
}

/// A registered handler type.
pub trait HandlerType: Capability<Event> {
    /// Construct a handler for `event`. Must not perform I/O.
    fn build(&self, event: &Event) -> Box<dyn EventHandler>;
}

/// State shared by the handlers dispatched for one event.
pub struct EventContext {
    event: Event,
    queue: Arc<dyn EventQueue>,
    scheduler: SchedulerHandle,
    deleted: bool,
}

impl EventContext {
    /// Create a context for `event`.
    pub fn new(event: Event, queue: Arc<dyn EventQueue>, scheduler: SchedulerHandle) -> Self {
        Self {
            event,
            queue,
            scheduler,
            deleted: false,
        }
    }

    /// The event being dispatched.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    /// Whether the event has been deleted from the queue.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Delete the event from the queue. Deleting twice is a no-op.
    pub async fn delete(&mut self) -> Result<(), StoreError> {
        if self.deleted {
            return Ok(());
        }
        self.queue.delete(self.event.id).await?;
        self.deleted = true;
        tracing::debug!(event_id = self.event.id, "event disposed of");
        Ok(())
    }

    /// The event queue, for handlers that post follow-up events.
    #[must_use]
    pub fn queue(&self) -> &Arc<dyn EventQueue> {
        &self.queue
    }

    /// Schedule a delayed callback on the engine's task runner. Failures in
    /// the callback are logged and ignored.
    pub fn schedule<F, Fut>(&self, delay: Duration, label: impl Into<String>, action: F) -> TaskHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.scheduler
            .schedule(delay, PLUGIN_TASKS_PRIORITY, label, action)
    }

    /// Cancel a callback scheduled with [`EventContext::schedule`].
    pub fn cancel(&self, handle: TaskHandle) -> bool {
        self.scheduler.cancel(handle)
    }
}
