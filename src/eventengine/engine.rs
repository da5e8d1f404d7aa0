//! The event queue engine.
//!
//! Checks the event queue at a fixed interval and immediately whenever the
//! store publishes an insert notification. Each new event is given to the
//! handlers that can handle it; events nobody claims become generic alerts.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::config::EngineConfig;
use crate::core::error::panic_message;
use crate::core::{
    NotificationSource, NotifyWaiter, PluginError, Registry, RetryPolicy, SchedulerError,
    SchedulerHandle, StoreError, TaskHandle, TaskResult, TaskRunner,
};
use crate::eventengine::alerts::{Alert, AlertSink};
use crate::eventengine::event::{Event, EventId, EventState};
use crate::eventengine::handler::{EventContext, HandlerType, PLUGIN_TASKS_PRIORITY};
use crate::eventengine::queue::EventQueue;

const QUEUE_CHECK_PRIORITY: i32 = 0;
const PERIODIC_CHECK_LABEL: &str = "periodic queue check";
const QUEUE_CHECK_LABEL: &str = "queue check";

/// Event processing engine. One per consumer target.
pub struct EventEngine {
    target: String,
    check_interval: Duration,
    subscribe_retry: RetryPolicy,
    query_retry: RetryPolicy,
    queue: Arc<dyn EventQueue>,
    alerts: Arc<dyn AlertSink>,
    handlers: Registry<dyn HandlerType>,
    scheduler: SchedulerHandle,
    last_event_id: tokio::sync::Mutex<EventId>,
}

impl std::fmt::Debug for EventEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEngine")
            .field("target", &self.target)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl EventEngine {
    /// Create an engine. Handlers are taken from an explicit registration list.
    pub fn new(
        config: &EngineConfig,
        queue: Arc<dyn EventQueue>,
        alerts: Arc<dyn AlertSink>,
        handlers: Registry<dyn HandlerType>,
        scheduler: SchedulerHandle,
    ) -> Arc<Self> {
        let names: Vec<&str> = handlers.iter().map(|h| h.name()).collect();
        tracing::debug!(
            "found {} event handler{}: {:?}",
            names.len(),
            if names.len() == 1 { "" } else { "s" },
            names
        );
        Arc::new(Self {
            target: config.target.clone(),
            check_interval: config.check_interval(),
            subscribe_retry: config.subscribe_retry.policy(),
            query_retry: config.query_retry.policy(),
            queue,
            alerts,
            handlers,
            scheduler,
            last_event_id: tokio::sync::Mutex::new(0),
        })
    }

    /// Queue target name this engine consumes.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Handle to the task runner driving this engine.
    #[must_use]
    pub const fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Identity of the newest event fetched so far.
    pub async fn last_event_id(&self) -> EventId {
        *self.last_event_id.lock().await
    }

    /// Subscribe to insert notifications and drive the engine until shutdown
    /// or a fatal storage failure.
    pub async fn run(self: &Arc<Self>, notifications: Arc<dyn NotificationSource>) -> Result<(), SchedulerError> {
        tracing::info!("--- starting event engine ---");
        self.listen(notifications.as_ref()).await?;

        let waiter = NotifyWaiter::new(notifications, self.subscribe_retry);
        let engine = Arc::clone(self);
        let mut runner = TaskRunner::new(self.scheduler.clone(), waiter)
            .with_notification_hook(Arc::new(move |_: &SchedulerHandle| {
                engine.schedule_queue_check();
            }));

        self.schedule_periodic_check(Duration::ZERO);
        runner.run_forever().await
    }

    async fn listen(&self, notifications: &dyn NotificationSource) -> Result<(), SchedulerError> {
        tracing::debug!("registering event listener with store");
        self.subscribe_retry
            .run("listen", move || notifications.subscribe())
            .await
    }

    /// Schedule the self-perpetuating regular queue check.
    pub fn schedule_periodic_check(self: &Arc<Self>, delay: Duration) -> TaskHandle {
        let engine = Arc::clone(self);
        self.scheduler.schedule(
            delay,
            QUEUE_CHECK_PRIORITY,
            PERIODIC_CHECK_LABEL,
            move || async move {
                engine.load_new_events().await?;
                engine.schedule_periodic_check(engine.check_interval);
                Ok(())
            },
        )
    }

    /// Schedule an immediate, out-of-band queue check.
    pub fn schedule_queue_check(self: &Arc<Self>) -> TaskHandle {
        tracing::debug!("got event notification from store");
        let engine = Arc::clone(self);
        self.scheduler.schedule(
            Duration::ZERO,
            QUEUE_CHECK_PRIORITY,
            QUEUE_CHECK_LABEL,
            move || async move { engine.load_new_events().await.map(|_| ()) },
        )
    }

    /// Schedule `action` after `delay` on the engine's runner.
    pub fn schedule<F, Fut>(&self, delay: Duration, label: impl Into<String>, action: F) -> TaskHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.scheduler
            .schedule(delay, PLUGIN_TASKS_PRIORITY, label, action)
    }

    /// Cancel a task scheduled with [`EventEngine::schedule`].
    pub fn cancel(&self, handle: TaskHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    /// Load and process new events on the queue, if any.
    ///
    /// Returns the number of events fetched. Connectivity loss that survives
    /// the query retry policy is fatal; any other failure is logged and
    /// treated as an empty check.
    pub async fn load_new_events(&self) -> Result<usize, SchedulerError> {
        let mut last_event_id = self.last_event_id.lock().await;
        tracing::debug!("checking for new events on queue");

        let after = *last_event_id;
        let queue = &self.queue;
        let target = self.target.as_str();
        let fetched = self
            .query_retry
            .run("fetch events", move || queue.fetch_after(target, after))
            .await;
        let events = match fetched {
            Ok(events) => events,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::error!("failed to load events from queue: {err}");
                return Ok(0);
            }
        };
        let Some(last) = events.last() else {
            return Ok(0);
        };

        tracing::info!("found {} new events in queue db", events.len());
        *last_event_id = last.id;
        let count = events.len();

        for event in events {
            let id = event.id;
            let description = event.to_string();
            if let Err(err) = self.handle_event(event).await {
                tracing::error!("unhandled error while handling {description}, deleting event: {err}");
                self.delete_after_failure(id).await?;
            }
        }

        self.log_task_queue();
        Ok(count)
    }

    async fn delete_after_failure(&self, id: EventId) -> Result<(), SchedulerError> {
        let queue = &self.queue;
        let deleted = self
            .query_retry
            .run("delete event", move || queue.delete(id))
            .await;
        match deleted {
            Ok(_) => Ok(()),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::error!(event_id = id, "failed to delete event: {err}");
                Ok(())
            }
        }
    }

    fn log_task_queue(&self) {
        let pending: Vec<String> = self
            .scheduler
            .pending_labels()
            .into_iter()
            .filter(|label| label != PERIODIC_CHECK_LABEL)
            .collect();
        if !pending.is_empty() {
            tracing::debug!("task queue: {pending:?}");
        }
    }

    /// Dispatch a single event to its applicable handlers.
    ///
    /// Handler failures are logged and do not stop the remaining handlers.
    /// When the sole applicable handler fails, the event is deleted. Once the
    /// event is deleted no further handler sees it. An event left in place is
    /// held for a later check.
    pub async fn handle_event(&self, event: Event) -> Result<(), StoreError> {
        tracing::debug!("handling {event}");
        let handlers: Vec<_> = self
            .handlers
            .applicable(&event)
            .into_iter()
            .map(|kind| (kind.name(), kind.build(&event)))
            .collect();
        let names: Vec<&str> = handlers.iter().map(|(name, _)| *name).collect();
        tracing::debug!("plugins that can handle: {names:?}");

        let mut ctx = EventContext::new(event, Arc::clone(&self.queue), self.scheduler.clone());
        if handlers.is_empty() {
            return self.post_generic_alert(&mut ctx).await;
        }

        let sole_handler = handlers.len() == 1;
        for (name, mut handler) in handlers {
            if ctx.is_deleted() {
                tracing::debug!("event disposed of before {name} could see it");
                break;
            }
            tracing::debug!("giving event to {name}");
            let outcome = AssertUnwindSafe(handler.handle(&mut ctx)).catch_unwind().await;
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(panic) => PluginError::Other(anyhow::anyhow!(panic_message(panic.as_ref()))),
            };
            tracing::error!("unhandled error in plugin {name}; ignoring it: {failure:#}");
            if sole_handler {
                // Only one handler and it failed; the event will probably
                // never be handled.
                ctx.delete().await?;
            }
        }

        if !ctx.is_deleted() {
            tracing::debug!("event wasn't disposed of, maybe held for later processing?");
        }
        Ok(())
    }

    async fn post_generic_alert(&self, ctx: &mut EventContext) -> Result<(), StoreError> {
        let alert = Alert::from_event(ctx.event());
        let stateless = alert.state == EventState::Stateless;
        if stateless || !self.alerts.is_duplicate(&alert).await? {
            tracing::debug!("posting {} event", alert.event_type);
            self.alerts.post(alert).await?;
        } else {
            tracing::info!("ignoring duplicate {} event", alert.event_type);
        }
        ctx.delete().await
    }
}
